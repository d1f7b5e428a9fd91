//! Carry propagation
//!
//! Settles a fresh bloc into a staged copy of the slot array, merging with
//! and clearing every occupied level it meets on the way up.

use crate::bloc::{Bloc, MAX_LEVELS};
use crate::error::{BlocError, Result};
use crate::store::{Address, ContentStore};

use super::SlotArray;

/// Result of a carry pass, not yet committed
pub(crate) struct Settled {
    pub slots: SlotArray,
    pub level: usize,
    pub address: Address,
    pub bloc_len: usize,
    pub merges: usize,
}

/// Run the carry loop for `fresh` against `committed`.
///
/// `committed` is never modified. On error the caller still holds the
/// pre-flush state; blocs already written are left in the store unreferenced.
pub(crate) fn carry<S>(store: &S, committed: &SlotArray, fresh: Bloc) -> Result<Settled>
where
    S: ContentStore + ?Sized,
{
    let mut staged = committed.clone();
    let mut level = fresh.level()?;
    let mut bloc = fresh;
    let mut merges = 0;

    loop {
        if level >= MAX_LEVELS {
            return Err(BlocError::LevelOverflow(level));
        }

        match staged.get(level) {
            None => {
                let address = store.put(bloc.as_bytes())?;
                staged.set(level, address);
                return Ok(Settled {
                    slots: staged,
                    level,
                    address,
                    bloc_len: bloc.len(),
                    merges,
                });
            }
            Some(existing_address) => {
                let existing = Bloc::from_bytes(store.get(&existing_address)?)?;
                tracing::debug!(
                    level,
                    incoming = bloc.len(),
                    existing = existing.len(),
                    "carrying into next level"
                );
                bloc = bloc.merged(&existing);
                staged.clear(level);
                level += 1;
                merges += 1;
            }
        }
    }
}
