use tokio::sync::watch;

/// Shared in-memory state with a cloneable handle.
///
/// Every transition runs as one closure under the channel's lock, so readers
/// never observe a half-applied update. Subscribers are woken after each
/// dispatch.
pub struct StateContainer<S> {
    tx: watch::Sender<S>,
}

impl<S> Clone for StateContainer<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: Clone> StateContainer<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get_state(&self) -> S {
        self.tx.borrow().clone()
    }

    /// Read without cloning the whole state
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    /// Apply one atomic transition and notify subscribers.
    pub fn dispatch<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut result = None;
        self.tx.send_modify(|state| result = Some(f(state)));
        match result {
            Some(result) => result,
            // send_modify always runs the closure
            None => unreachable!("dispatch closure did not run"),
        }
    }

    pub fn replace(&self, state: S) -> S {
        self.tx.send_replace(state)
    }
}
