//! Combine-latest merge of listing streams from several sources.
//!
//! The merged stream remembers the latest status of every source and, on each
//! update, reports:
//!
//! - `Loading(progress)` while some source has not settled, where progress
//!   is the share of settled sources;
//! - `Success(concatenation)` in source order once every source settled and
//!   at least one succeeded;
//! - `Error(kind)` of the first failing source when every source failed.
//!
//! A source stream that ends without ever settling counts as settled with
//! nothing to contribute, so one faulty source cannot hold the merge in
//! `Loading` forever.

use core_library::status::{ErrorKind, MediaStream, RequestStatus};
use futures::future;
use futures::stream::{self, StreamExt};

#[derive(Debug, Clone)]
enum Slot<T> {
    Waiting,
    Latest(RequestStatus<Vec<T>>),
    Ended,
}

impl<T> Slot<T> {
    fn is_settled(&self) -> bool {
        match self {
            Slot::Waiting => false,
            Slot::Latest(status) => status.is_settled(),
            Slot::Ended => true,
        }
    }
}

fn combine<T: Clone>(slots: &[Slot<T>]) -> RequestStatus<Vec<T>> {
    let settled = slots.iter().filter(|slot| slot.is_settled()).count();
    if settled < slots.len() {
        // settled < len keeps this below 100.
        let percent = (settled * 100 / slots.len()) as u8;
        return RequestStatus::progress(percent);
    }

    let mut merged = Vec::new();
    let mut first_error: Option<ErrorKind> = None;
    let mut any_success = false;
    for slot in slots {
        match slot {
            Slot::Latest(RequestStatus::Success(items)) => {
                any_success = true;
                merged.extend(items.iter().cloned());
            }
            Slot::Latest(RequestStatus::Error(kind)) => {
                first_error.get_or_insert(*kind);
            }
            _ => {}
        }
    }

    match first_error {
        Some(kind) if !any_success => RequestStatus::Error(kind),
        _ => RequestStatus::Success(merged),
    }
}

/// Merge listings; always starts with `Loading(None)`.
pub fn merge_listings<T>(sources: Vec<MediaStream<Vec<T>>>) -> MediaStream<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let start = stream::once(future::ready(RequestStatus::Loading(None)));
    if sources.is_empty() {
        return start
            .chain(stream::once(future::ready(RequestStatus::Success(Vec::new()))))
            .boxed();
    }

    let count = sources.len();
    let tagged = sources.into_iter().enumerate().map(|(position, source)| {
        source
            .map(move |status| (position, Some(status)))
            .chain(stream::once(future::ready((position, None))))
            .boxed()
    });

    let updates = stream::select_all(tagged)
        .scan(
            (vec![Slot::Waiting; count], None),
            |(slots, last): &mut (Vec<Slot<T>>, Option<Option<u8>>), (position, status)| {
                let slot = &mut slots[position];
                match status {
                    Some(status) => *slot = Slot::Latest(status),
                    None if slot.is_settled() => return future::ready(Some(None)),
                    None => *slot = Slot::Ended,
                }

                let combined = combine(slots);
                // Skip repeats of the same progress.
                let emit = match &combined {
                    RequestStatus::Loading(progress) if *last == Some(*progress) => None,
                    RequestStatus::Loading(progress) => {
                        *last = Some(*progress);
                        Some(combined)
                    }
                    _ => {
                        *last = None;
                        Some(combined)
                    }
                };
                future::ready(Some(emit))
            },
        )
        .filter_map(future::ready);

    start.chain(updates).boxed()
}
