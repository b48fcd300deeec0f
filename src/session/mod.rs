/*!
 * Resumable batch state.
 *
 * - `snapshot`: `BatchSnapshot`, the saved items of an interrupted run
 * - `store`: `SnapshotStore`, persistence in the `batch_snapshots` table
 */

pub mod snapshot;
pub mod store;

pub use snapshot::BatchSnapshot;
pub use store::SnapshotStore;
