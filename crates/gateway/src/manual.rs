//! Manually driven gateway for deterministic tests
//!
//! Holds every accepted dispatch until the test completes it by hand, so
//! tests control exactly which requests answer, in what order, and which
//! never do.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::trace;

use contracts::{
    Completion, CompletionCallback, ContractError, CorrelationToken, EndpointId, RequestGateway,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inflight {
    destination: EndpointId,
    payload: Bytes,
    callback: CompletionCallback,
}

#[derive(Default)]
struct ManualInner {
    inflight: HashMap<CorrelationToken, Inflight>,
    /// Tokens in dispatch order.
    order: Vec<CorrelationToken>,
    /// 0-based sequence number of the next dispatch.
    next_seq: usize,
    /// Dispatch sequence numbers to reject synchronously.
    reject_seqs: HashSet<usize>,
}

/// Gateway whose completions are driven by the test.
#[derive(Default)]
pub struct ManualGateway {
    inner: Mutex<ManualInner>,
}

impl ManualGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the dispatches with these 0-based sequence numbers.
    pub fn reject_dispatches(&self, seqs: impl IntoIterator<Item = usize>) {
        lock(&self.inner).reject_seqs.extend(seqs);
    }

    /// Tokens of held dispatches, in dispatch order.
    pub fn inflight_tokens(&self) -> Vec<CorrelationToken> {
        let inner = lock(&self.inner);
        inner
            .order
            .iter()
            .filter(|t| inner.inflight.contains_key(t))
            .copied()
            .collect()
    }

    /// Number of dispatches currently held.
    pub fn inflight_len(&self) -> usize {
        lock(&self.inner).inflight.len()
    }

    /// Payload of a held dispatch.
    pub fn payload(&self, token: CorrelationToken) -> Option<Bytes> {
        lock(&self.inner)
            .inflight
            .get(&token)
            .map(|held| held.payload.clone())
    }

    /// Complete a held dispatch. Returns false if the token is not held
    /// (never dispatched, or already completed).
    pub fn complete(&self, token: CorrelationToken, completion: Completion) -> bool {
        let held = lock(&self.inner).inflight.remove(&token);
        match held {
            Some(held) => {
                trace!(token = %token, destination = %held.destination, "Manual completion");
                (held.callback)(completion);
                true
            }
            None => false,
        }
    }

    /// Complete every held dispatch by echoing its payload back.
    pub fn complete_all_with_echo(&self) {
        for token in self.inflight_tokens() {
            if let Some(payload) = self.payload(token) {
                self.complete(token, Completion::Reply(payload));
            }
        }
    }
}

impl RequestGateway for ManualGateway {
    fn dispatch(
        &self,
        destination: &EndpointId,
        payload: Bytes,
        token: CorrelationToken,
        on_complete: CompletionCallback,
    ) -> Result<(), ContractError> {
        let mut inner = lock(&self.inner);
        let seq = inner.next_seq;
        inner.next_seq += 1;

        if inner.reject_seqs.contains(&seq) {
            return Err(ContractError::dispatch_rejected(
                destination.as_str(),
                format!("scripted rejection of dispatch #{seq}"),
            ));
        }

        inner.order.push(token);
        inner.inflight.insert(
            token,
            Inflight {
                destination: destination.clone(),
                payload,
                callback: on_complete,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_holds_until_completed() {
        let gateway = ManualGateway::new();
        let completions = Arc::new(AtomicUsize::new(0));

        let token = CorrelationToken::mint();
        let counter = Arc::clone(&completions);
        gateway
            .dispatch(
                &"svc.echo".into(),
                Bytes::from_static(b"held"),
                token,
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(gateway.inflight_len(), 1);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
        assert_eq!(&gateway.payload(token).unwrap()[..], b"held");

        assert!(gateway.complete(token, Completion::Reply(Bytes::new())));
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.inflight_len(), 0);

        // Second completion of the same token is refused
        assert!(!gateway.complete(token, Completion::Reply(Bytes::new())));
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scripted_rejection() {
        let gateway = ManualGateway::new();
        gateway.reject_dispatches([1]);

        let first = gateway.dispatch(
            &"svc".into(),
            Bytes::new(),
            CorrelationToken::mint(),
            Box::new(|_| {}),
        );
        let second = gateway.dispatch(
            &"svc".into(),
            Bytes::new(),
            CorrelationToken::mint(),
            Box::new(|_| {}),
        );

        assert!(first.is_ok());
        assert!(matches!(
            second,
            Err(ContractError::DispatchRejected { .. })
        ));
        assert_eq!(gateway.inflight_len(), 1);
    }
}
