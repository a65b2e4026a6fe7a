use crate::loader::{LoadError, LoadQueue, LoadRequest, Ticket};
use donutfield_common::{CancellationToken, MatcapId};
use donutfield_kernel::MaterialSlots;

/// Result of one completion drained by [`MatcapSwapper::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    /// Both materials now show `matcap`.
    Applied {
        ticket: Ticket,
        matcap: MatcapId,
        generation: u64,
    },
    /// A newer selection superseded this one; the result was dropped.
    Stale { ticket: Ticket, matcap: MatcapId },
    /// The latest selection failed; the previous texture stays in place.
    Failed {
        ticket: Ticket,
        matcap: MatcapId,
        error: LoadError,
    },
    Cancelled { ticket: Ticket, matcap: MatcapId },
}

#[derive(Debug)]
struct Pending {
    ticket: Ticket,
    matcap: MatcapId,
    cancel: CancellationToken,
}

/// Hot-swaps the matcap texture shared by both materials.
///
/// Selections may complete out of order. Only the latest issued ticket is
/// ever applied, so the final texture always matches the final selection.
pub struct MatcapSwapper<Q: LoadQueue> {
    queue: Q,
    next_ticket: u64,
    applied: Option<Ticket>,
    pending: Option<Pending>,
    requested: Option<MatcapId>,
    active: Option<MatcapId>,
    last_error: Option<String>,
}

impl<Q: LoadQueue> MatcapSwapper<Q> {
    pub fn new(queue: Q) -> Self {
        Self {
            queue,
            next_ticket: 1,
            applied: None,
            pending: None,
            requested: None,
            active: None,
            last_error: None,
        }
    }

    /// Request `matcap` for both materials.
    ///
    /// Any earlier pending request is cancelled. Selecting the matcap already
    /// pending returns its ticket. Selecting the active matcap with nothing
    /// pending returns the ticket that applied it and clears any error left by
    /// a failed load in between.
    pub fn select(&mut self, matcap: MatcapId) -> Ticket {
        if let Some(pending) = &self.pending {
            if pending.matcap == matcap {
                return pending.ticket;
            }
        } else if self.active == Some(matcap) {
            if let Some(applied) = self.applied {
                self.requested = self.active;
                self.last_error = None;
                return applied;
            }
        }

        if let Some(previous) = self.pending.take() {
            previous.cancel.cancel();
            tracing::debug!(ticket = previous.ticket.0, matcap = %previous.matcap, "superseded pending load");
        }

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        let cancel = CancellationToken::new();
        self.queue.submit(LoadRequest {
            ticket,
            matcap,
            cancel: cancel.clone(),
        });
        tracing::debug!(ticket = ticket.0, %matcap, "matcap requested");

        self.requested = Some(matcap);
        self.pending = Some(Pending {
            ticket,
            matcap,
            cancel,
        });
        ticket
    }

    /// Apply finished loads to `materials`. Call once per frame on the thread
    /// that owns the materials.
    pub fn poll(&mut self, materials: &mut MaterialSlots) -> Vec<SwapOutcome> {
        let mut outcomes = Vec::new();
        while let Some(done) = self.queue.try_complete() {
            let ticket = done.ticket;
            let matcap = done.matcap;
            let is_latest = self.pending.as_ref().is_some_and(|p| p.ticket == ticket);
            if !is_latest {
                tracing::warn!(ticket = ticket.0, %matcap, "discarding stale texture load");
                outcomes.push(SwapOutcome::Stale { ticket, matcap });
                continue;
            }
            self.pending = None;

            let outcome = match done.result {
                Ok(texture) => {
                    let generation = materials.retexture(texture);
                    self.active = Some(matcap);
                    self.applied = Some(ticket);
                    self.last_error = None;
                    tracing::info!(%matcap, generation, "matcap applied");
                    SwapOutcome::Applied {
                        ticket,
                        matcap,
                        generation,
                    }
                }
                Err(LoadError::Cancelled) => SwapOutcome::Cancelled { ticket, matcap },
                Err(error) => {
                    tracing::warn!(%matcap, %error, "matcap load failed, keeping previous texture");
                    self.last_error = Some(format!("matcap {matcap}: {error}"));
                    SwapOutcome::Failed {
                        ticket,
                        matcap,
                        error,
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Cancel any pending request. Its completion will report `Cancelled`.
    pub fn cancel_pending(&mut self) {
        if let Some(pending) = &self.pending {
            pending.cancel.cancel();
        }
    }

    /// Most recent selection, whether or not it has loaded.
    pub fn requested(&self) -> Option<MatcapId> {
        self.requested
    }

    /// Matcap currently applied to the materials.
    pub fn active(&self) -> Option<MatcapId> {
        self.active
    }

    pub fn pending(&self) -> Option<MatcapId> {
        self.pending.as_ref().map(|p| p.matcap)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
