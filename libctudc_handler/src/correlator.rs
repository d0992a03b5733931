use std::cmp::Ordering;
use std::iter::Fuse;

use super::decor_track::DecorTables;
use super::error::{CorrelatorError, CtudcStackError, NevodStackError};
use super::event::Event;
use super::ext_event::ExtEvent;
use super::nevod_event::NevodEventMeta;

/// Joins the CTUDC event stream with the NEVOD stream and the DECOR track tables.
///
/// Both streams must be ordered by event number within one run. Every CTUDC event
/// yields exactly one [`ExtEvent`] in CTUDC order; the NEVOD stream is advanced
/// lazily and may skip ahead of or lag behind the CTUDC stream. A NEVOD record
/// numbered past the current CTUDC event is held back for the following ones.
///
/// Any error ends the stream after it has been yielded.
#[derive(Debug)]
pub struct Correlator<C, N>
where
    C: Iterator<Item = Result<Event, CtudcStackError>>,
    N: Iterator<Item = Result<NevodEventMeta, NevodStackError>>,
{
    ctudc: C,
    nevod: Fuse<N>,
    pending: Option<NevodEventMeta>,
    decor: DecorTables,
    previous: Option<(u64, u64)>,
    require_nevod: bool,
    is_ended: bool,
    n_joined: u64,
    n_unmatched: u64,
}

impl<C, N> Correlator<C, N>
where
    C: Iterator<Item = Result<Event, CtudcStackError>>,
    N: Iterator<Item = Result<NevodEventMeta, NevodStackError>>,
{
    pub fn new(ctudc: C, nevod: N, decor: DecorTables) -> Self {
        Self {
            ctudc,
            nevod: nevod.fuse(),
            pending: None,
            decor,
            previous: None,
            require_nevod: false,
            is_ended: false,
            n_joined: 0,
            n_unmatched: 0,
        }
    }

    /// Drop CTUDC events that have no NEVOD partner instead of emitting them bare
    pub fn require_nevod(mut self, require: bool) -> Self {
        self.require_nevod = require;
        self
    }

    /// Number of CTUDC events joined with a NEVOD record so far
    pub fn n_joined(&self) -> u64 {
        self.n_joined
    }

    /// Number of CTUDC events without a NEVOD partner so far
    pub fn n_unmatched(&self) -> u64 {
        self.n_unmatched
    }

    fn check_order(&mut self, event: &Event) -> Result<(), CorrelatorError> {
        if let Some((prev_run, prev_event)) = self.previous {
            if event.key() < (prev_run, prev_event) {
                return Err(CorrelatorError::OrderingViolation {
                    run: event.run,
                    event: event.event,
                    prev_run,
                    prev_event,
                });
            }
        }
        self.previous = Some(event.key());
        Ok(())
    }

    /// Advance the NEVOD stream up to the given CTUDC event
    fn match_nevod(&mut self, event: &Event) -> Result<Option<NevodEventMeta>, CorrelatorError> {
        loop {
            let meta = match self.pending.take() {
                Some(meta) => meta,
                None => match self.nevod.next() {
                    Some(meta) => meta?,
                    None => return Ok(None),
                },
            };
            if meta.run as u64 != event.run {
                return Err(CorrelatorError::RunMismatch {
                    ctudc_run: event.run,
                    nevod_run: meta.run as u64,
                });
            }
            match (meta.event as u64).cmp(&event.event) {
                Ordering::Equal => return Ok(Some(meta)),
                Ordering::Greater => {
                    self.pending = Some(meta);
                    return Ok(None);
                }
                Ordering::Less => continue,
            }
        }
    }

    fn correlate(&mut self, event: Event) -> Result<Option<ExtEvent>, CorrelatorError> {
        self.check_order(&event)?;
        let nevod = self.match_nevod(&event)?;
        if nevod.is_some() {
            self.n_joined += 1;
        } else {
            self.n_unmatched += 1;
            if self.require_nevod {
                spdlog::debug!("Dropping CTUDC event {} without NEVOD data", event.event);
                return Ok(None);
            }
        }
        let decor = self.decor.classify(event.event);
        Ok(Some(ExtEvent::new(event, nevod, decor)))
    }
}

impl<C, N> Iterator for Correlator<C, N>
where
    C: Iterator<Item = Result<Event, CtudcStackError>>,
    N: Iterator<Item = Result<NevodEventMeta, NevodStackError>>,
{
    type Item = Result<ExtEvent, CorrelatorError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.is_ended {
            let result = match self.ctudc.next() {
                Some(Ok(event)) => self.correlate(event),
                Some(Err(e)) => Err(e.into()),
                None => {
                    self.is_ended = true;
                    return None;
                }
            };
            match result {
                Ok(Some(ext)) => return Some(Ok(ext)),
                Ok(None) => continue,
                Err(e) => {
                    self.is_ended = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
