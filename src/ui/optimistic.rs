use crate::api::error::ApiError;

/// How an optimistic change ended.
#[derive(Debug)]
pub enum MutationOutcome {
    Committed,
    RolledBack(ApiError),
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed)
    }
}

/// An applied but unconfirmed change to one entry of a list. Holds what the
/// entry looked like before so it can be put back.
#[must_use = "a pending change must be committed or rolled back"]
#[derive(Debug)]
pub struct Pending<T> {
    index: usize,
    previous: T,
}

impl<T: Clone> Pending<T> {
    pub fn commit(self) -> MutationOutcome {
        MutationOutcome::Committed
    }

    /// Restore the entry. If the list shrank meanwhile there is nothing left
    /// to restore and the error is still reported.
    pub fn rollback(self, list: &mut [T], err: ApiError) -> MutationOutcome {
        if let Some(slot) = list.get_mut(self.index) {
            *slot = self.previous;
        }
        MutationOutcome::RolledBack(err)
    }

    /// Commit on `Ok`, roll back on `Err`.
    pub fn settle(self, list: &mut [T], result: crate::api::Result<()>) -> MutationOutcome {
        match result {
            Ok(()) => self.commit(),
            Err(e) => {
                log::warn!("[optimistic] rolling back: {e}");
                self.rollback(list, e)
            }
        }
    }
}

/// Apply `mutate` to the first entry matching `pred`, returning the pending
/// change, or `None` if nothing matched.
pub fn apply<T, P, F>(list: &mut [T], pred: P, mutate: F) -> Option<Pending<T>>
where
    T: Clone,
    P: Fn(&T) -> bool,
    F: FnOnce(&mut T),
{
    let index = list.iter().position(pred)?;
    let previous = list[index].clone();
    mutate(&mut list[index]);
    Some(Pending { index, previous })
}
