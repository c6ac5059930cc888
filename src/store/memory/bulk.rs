use crate::context::Context;
use crate::document::DocumentRef;
use crate::errors::StoreError;
use crate::store::bulk::{BulkJob, BulkResults, BulkWriter};
use crate::types::FieldUpdate;
use bson::Document as BsonDocument;

use super::MemoryStore;

pub(crate) enum PendingOp {
    Create { doc: DocumentRef, data: BsonDocument },
    Update { doc: DocumentRef, updates: Vec<FieldUpdate> },
}

/// Buffers requests and flushes them across scoped worker threads, either when the
/// buffer reaches `bulk_max_pending` or on `end`.
pub struct MemoryBulkWriter<'a> {
    store: &'a MemoryStore,
    ctx: &'a Context,
    pending: Vec<(BulkJob, PendingOp)>,
    results: BulkResults,
    next_job: usize,
    closed: bool,
}

impl<'a> MemoryBulkWriter<'a> {
    pub(crate) fn new(store: &'a MemoryStore, ctx: &'a Context) -> Self {
        Self {
            store,
            ctx,
            pending: Vec::new(),
            results: BulkResults::default(),
            next_job: 0,
            closed: false,
        }
    }

    fn enqueue(&mut self, doc: &DocumentRef, op: PendingOp) -> Result<BulkJob, StoreError> {
        if self.closed {
            return Err(StoreError::BulkWriterClosed);
        }
        self.ctx.check()?;
        super::check_id(doc)?;
        let job = BulkJob(self.next_job);
        self.next_job += 1;
        self.pending.push((job, op));
        if self.pending.len() >= self.store.options().bulk_max_pending {
            self.flush();
        }
        Ok(job)
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        let workers = self.store.options().bulk_workers.clamp(1, pending.len());
        let store = self.store;
        let ctx = self.ctx;
        log::debug!("bulk flush: {} requests on {workers} workers", pending.len());

        if workers == 1 {
            for (job, op) in pending {
                self.results.insert(job, store.apply(ctx, op));
            }
            return;
        }

        let mut buckets: Vec<Vec<(BulkJob, PendingOp)>> =
            (0..workers).map(|_| Vec::new()).collect();
        for (i, item) in pending.into_iter().enumerate() {
            buckets[i % workers].push(item);
        }
        let outcomes: Vec<(BulkJob, Result<(), StoreError>)> = std::thread::scope(|s| {
            let handles: Vec<_> = buckets
                .into_iter()
                .map(|bucket| {
                    s.spawn(move || {
                        bucket
                            .into_iter()
                            .map(|(job, op)| (job, store.apply(ctx, op)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|h| match h.join() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        log::error!("bulk worker panicked; its requests have no result");
                        None
                    }
                })
                .flatten()
                .collect()
        });
        for (job, r) in outcomes {
            self.results.insert(job, r);
        }
    }
}

impl BulkWriter for MemoryBulkWriter<'_> {
    fn create(&mut self, doc: &DocumentRef, data: BsonDocument) -> Result<BulkJob, StoreError> {
        self.enqueue(doc, PendingOp::Create { doc: doc.clone(), data })
    }

    fn update(
        &mut self,
        doc: &DocumentRef,
        updates: Vec<FieldUpdate>,
    ) -> Result<BulkJob, StoreError> {
        self.enqueue(doc, PendingOp::Update { doc: doc.clone(), updates })
    }

    fn end(&mut self) -> BulkResults {
        if !self.closed {
            self.flush();
            self.closed = true;
        }
        std::mem::take(&mut self.results)
    }
}
