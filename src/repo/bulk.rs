//! Bulk writes with per-item outcome aggregation.
//!
//! Every item is enqueued on one store bulk writer, the writer is finalized once, and
//! only then are outcomes inspected in input order. The fail policy decides how those
//! outcomes are reported, never which writes are attempted.

use crate::context::Context;
use crate::errors::{CompositeError, Op, RepoError, StoreError};
use crate::entity::Record;
use crate::logger::AUDIT_TARGET;
use crate::store::{BulkJob, BulkResults, BulkWriter, DocumentStore};
use crate::types::{DocumentId, FieldValues, field_updates};

const OP: Op = "repo.bulk_write";

/// Target and field values of one bulk update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateParams {
    pub table_name: String,
    pub id: DocumentId,
    pub fv: FieldValues,
}

/// One item of a heterogeneous bulk call.
pub enum BulkOp<'a> {
    /// Entities without an id get a generated one assigned before the write is queued.
    Create(&'a mut dyn Record),
    Update(UpdateParams),
}

/// Successful result of a bulk call. `failures` is set only for a partial success
/// under the ignore-fail policy.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub ids: Vec<DocumentId>,
    pub failures: Option<CompositeError>,
}

impl BulkOutcome {
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.failures.is_some()
    }

    #[must_use]
    pub const fn is_complete_success(&self) -> bool {
        self.failures.is_none()
    }

    /// Collapses a partial success into its composite error.
    ///
    /// # Errors
    /// `RepoError::Composite` if any item failed.
    pub fn into_result(self) -> Result<Vec<DocumentId>, RepoError> {
        match self.failures {
            Some(f) => Err(RepoError::Composite(f)),
            None => Ok(self.ids),
        }
    }
}

/// Owns the store writer for one bulk call and finalizes it exactly once.
struct BulkSession<'a> {
    writer: Box<dyn BulkWriter + 'a>,
    finished: bool,
}

impl<'a> BulkSession<'a> {
    fn open(store: &'a dyn DocumentStore, ctx: &'a Context) -> Self {
        Self { writer: store.bulk_writer(ctx), finished: false }
    }

    fn writer(&mut self) -> &mut (dyn BulkWriter + 'a) {
        self.writer.as_mut()
    }

    fn finish(mut self) -> BulkResults {
        self.finished = true;
        self.writer.end()
    }
}

impl Drop for BulkSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let dropped = self.writer.end();
            log::debug!("bulk session closed early; {} results discarded", dropped.len());
        }
    }
}

/// Per-item state between enqueue and finalization.
enum Slot {
    Queued(DocumentId, BulkJob),
    Rejected(DocumentId, RepoError),
}

fn item_error(id: &str, err: StoreError) -> RepoError {
    match err {
        StoreError::NotFound(_) => RepoError::NotFound { op: OP, id: id.to_string() },
        other => RepoError::store(OP, other),
    }
}

fn enqueue(store: &dyn DocumentStore, writer: &mut dyn BulkWriter, op: BulkOp<'_>) -> Slot {
    match op {
        BulkOp::Create(entity) => {
            let Some(col) = store.collection(entity.table_name()) else {
                let collection = entity.table_name().to_string();
                return Slot::Rejected(
                    entity.id().to_string(),
                    RepoError::NoParentCollection { op: OP, collection },
                );
            };
            let doc = if entity.id().is_empty() {
                let doc = store.new_doc(&col);
                entity.set_id(doc.id.clone());
                doc
            } else {
                col.doc(entity.id())
            };
            entity.set_active(true);
            let queued = entity.to_document().and_then(|data| writer.create(&doc, data));
            match queued {
                Ok(job) => Slot::Queued(doc.id, job),
                Err(e) => Slot::Rejected(doc.id.clone(), item_error(&doc.id, e)),
            }
        }
        BulkOp::Update(p) => {
            let Some(col) = store.collection(&p.table_name) else {
                return Slot::Rejected(
                    p.id,
                    RepoError::NoParentCollection { op: OP, collection: p.table_name },
                );
            };
            match writer.update(&col.doc(p.id.as_str()), field_updates(&p.fv)) {
                Ok(job) => Slot::Queued(p.id, job),
                Err(e) => {
                    let err = item_error(&p.id, e);
                    Slot::Rejected(p.id, err)
                }
            }
        }
    }
}

/// Runs `ops` as one bulk call.
///
/// With `ignore_fail = false` the first failing item, in input order, is returned as
/// the error. With `ignore_fail = true` every failure is collected: all items failing
/// is an error, some failing is a partial [`BulkOutcome`].
///
/// # Errors
/// The first item error (fail-fast) or `RepoError::Composite` when every item failed.
pub fn bulk_write(
    store: &dyn DocumentStore,
    ctx: &Context,
    ops: Vec<BulkOp<'_>>,
    ignore_fail: bool,
) -> Result<BulkOutcome, RepoError> {
    let total = ops.len();
    let mut session = BulkSession::open(store, ctx);
    let slots: Vec<Slot> = ops.into_iter().map(|op| enqueue(store, session.writer(), op)).collect();
    let mut results = session.finish();

    let mut ids = Vec::with_capacity(total);
    let mut failures = CompositeError::default();
    for slot in slots {
        let (id, outcome) = match slot {
            Slot::Queued(id, job) => {
                let outcome = results.take(job).map_err(|e| item_error(&id, e));
                (id, outcome)
            }
            Slot::Rejected(id, err) => (id, Err(err)),
        };
        match outcome {
            Ok(()) => ids.push(id),
            Err(err) if !ignore_fail => {
                log::info!(
                    target: AUDIT_TARGET,
                    "op={OP} total={total} failed_at={id} fail_fast=true"
                );
                return Err(err);
            }
            Err(err) => failures.push(id, err),
        }
    }

    log::info!(
        target: AUDIT_TARGET,
        "op={OP} total={total} failed={} fail_fast={}",
        failures.len(),
        !ignore_fail
    );
    if failures.is_empty() {
        Ok(BulkOutcome { ids, failures: None })
    } else if ids.is_empty() {
        Err(RepoError::Composite(failures))
    } else {
        Ok(BulkOutcome { ids, failures: Some(failures) })
    }
}

/// Creates every entity, assigning generated ids to those without one.
///
/// # Errors
/// See [`bulk_write`].
pub fn bulk_create<E: Record>(
    store: &dyn DocumentStore,
    ctx: &Context,
    entities: &mut [E],
    ignore_fail: bool,
) -> Result<BulkOutcome, RepoError> {
    let ops = entities.iter_mut().map(|e| BulkOp::Create(e as &mut dyn Record)).collect();
    bulk_write(store, ctx, ops, ignore_fail)
}

/// # Errors
/// See [`bulk_write`].
pub fn bulk_update(
    store: &dyn DocumentStore,
    ctx: &Context,
    params: Vec<UpdateParams>,
    ignore_fail: bool,
) -> Result<BulkOutcome, RepoError> {
    bulk_write(store, ctx, params.into_iter().map(BulkOp::Update).collect(), ignore_fail)
}
