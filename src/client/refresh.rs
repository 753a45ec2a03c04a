//! Single-flight gate shared by every request of one client.
//!
//! The first request that needs a refresh becomes the leader and receives a [`RefreshTicket`].
//! Requests failing authentication while the ticket is alive park a oneshot sender in a FIFO
//! queue. Releasing the ticket clears the flag and takes the queue under one lock, then settles
//! every waiter in enqueue order. Dropping an unreleased ticket (leader cancelled or panicked)
//! clears the flag as well; the queued senders are dropped with it, so their receivers observe
//! a closed channel instead of hanging.
//!
//! The gate also tracks a session epoch. Login, logout, restore, and termination bump it, and a
//! ticket admitted under an older epoch must not persist what its refresh returns.

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Value every queued request receives once the refresh settles.
pub(crate) type RefreshOutcome = Result<TokenSecret, Arc<Error>>;

#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
	state: Mutex<GateState>,
}
impl RefreshGate {
	/// Decides how a request that failed authentication with `used` should proceed.
	pub(crate) fn admit(&self, used: Option<&TokenSecret>) -> Admission<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			let (tx, rx) = oneshot::channel();

			state.pending.push_back(tx);

			return Admission::Queued(rx);
		}
		if let (Some(used), Some(rotation)) = (used, &state.rotation) {
			if *used == rotation.retired {
				return Admission::Superseded(rotation.successor.clone());
			}
		}

		state.refreshing = true;

		Admission::Leader(RefreshTicket {
			gate: self,
			used: used.cloned(),
			epoch: state.epoch,
			released: false,
		})
	}

	pub(crate) fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	pub(crate) fn pending_len(&self) -> usize {
		self.state.lock().pending.len()
	}

	/// Starts a new session epoch; tokens retired before it no longer shortcut a refresh.
	pub(crate) fn reset(&self) {
		let mut state = self.state.lock();

		state.epoch = state.epoch.wrapping_add(1);
		state.rotation = None;
	}
}

#[derive(Debug, Default)]
struct GateState {
	refreshing: bool,
	pending: VecDeque<oneshot::Sender<RefreshOutcome>>,
	rotation: Option<Rotation>,
	epoch: u64,
}

/// Last token pair swap performed by this gate's own refresh.
#[derive(Debug)]
struct Rotation {
	retired: TokenSecret,
	successor: TokenSecret,
}

/// Result of [`RefreshGate::admit`].
#[derive(Debug)]
pub(crate) enum Admission<'a> {
	/// No refresh is running; the caller must perform it and release the ticket.
	Leader(RefreshTicket<'a>),
	/// A refresh is running; await its outcome.
	Queued(oneshot::Receiver<RefreshOutcome>),
	/// This gate's last refresh already replaced the failing token; retry with its successor.
	Superseded(TokenSecret),
}

/// Proof of leadership over the in-flight refresh.
#[derive(Debug)]
pub(crate) struct RefreshTicket<'a> {
	gate: &'a RefreshGate,
	used: Option<TokenSecret>,
	epoch: u64,
	released: bool,
}
impl RefreshTicket<'_> {
	/// Returns `false` once the session this refresh started in has ended.
	pub(crate) fn is_current(&self) -> bool {
		self.gate.state.lock().epoch == self.epoch
	}

	/// Ends the refresh and settles every queued request with `outcome`, oldest first.
	///
	/// Returns the number of requests that were waiting.
	pub(crate) fn release(mut self, outcome: RefreshOutcome) -> usize {
		let waiters = {
			let mut state = self.gate.state.lock();

			state.refreshing = false;

			if let (Ok(successor), Some(retired)) = (&outcome, self.used.take()) {
				if state.epoch == self.epoch {
					state.rotation = Some(Rotation { retired, successor: successor.clone() });
				}
			}

			mem::take(&mut state.pending)
		};

		self.released = true;

		let count = waiters.len();

		for waiter in waiters {
			// A waiter whose caller went away has nothing left to settle.
			let _ = waiter.send(outcome.clone());
		}

		count
	}
}
impl Drop for RefreshTicket<'_> {
	fn drop(&mut self) {
		if self.released {
			return;
		}

		let abandoned = {
			let mut state = self.gate.state.lock();

			state.refreshing = false;

			mem::take(&mut state.pending)
		};

		drop(abandoned);
	}
}
