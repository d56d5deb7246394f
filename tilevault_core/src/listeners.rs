//! Generic multi-listener dispatch with partial-failure aggregation.
//!
//! Storage and configuration mutations notify observers through a
//! [`ListenerSet`]. Delivery guarantees that every listener is invoked even
//! when earlier ones fail; the failures are aggregated into a single
//! [`FanoutError`] whose primary is the **last** failure, with all earlier
//! failures preserved in invocation order.

use parking_lot::Mutex;
use std::{
	error::Error,
	fmt::{self, Debug, Display},
	sync::Arc,
};

/// Aggregated listener failures from one delivery pass.
///
/// `primary` is the error of the last listener that failed; `suppressed`
/// holds every earlier failure in invocation order.
#[derive(Debug)]
pub struct FanoutError<E> {
	pub primary: E,
	pub suppressed: Vec<E>,
}

impl<E> FanoutError<E> {
	/// Folds an ordered list of failures into one error; `None` when the
	/// list is empty.
	pub fn from_failures(mut failures: Vec<E>) -> Option<FanoutError<E>> {
		let primary = failures.pop()?;
		Some(FanoutError {
			primary,
			suppressed: failures,
		})
	}
}

impl<E: Display> Display for FanoutError<E> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.primary)?;
		if !self.suppressed.is_empty() {
			write!(f, " ({} earlier listener failure(s) suppressed)", self.suppressed.len())?;
		}
		Ok(())
	}
}

impl<E: Error + 'static> Error for FanoutError<E> {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		Some(&self.primary)
	}
}

/// An identity-de-duplicated, order-preserving set of listener handles.
///
/// `add`/`remove` and delivery share one lock, so each delivery pass sees a
/// consistent snapshot of the registered listeners. Listeners must not
/// mutate the set they are being delivered from.
pub struct ListenerSet<L: ?Sized> {
	listeners: Mutex<Vec<Arc<L>>>,
}

impl<L: ?Sized> Default for ListenerSet<L> {
	fn default() -> Self {
		Self::new()
	}
}

impl<L: ?Sized> ListenerSet<L> {
	pub fn new() -> ListenerSet<L> {
		ListenerSet {
			listeners: Mutex::new(Vec::new()),
		}
	}

	/// Registers a listener; a handle already present (by identity) is not
	/// added twice.
	pub fn add(&self, listener: Arc<L>) {
		let mut listeners = self.listeners.lock();
		if !listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
			listeners.push(listener);
		}
	}

	/// Removes a listener by identity; returns whether it was present.
	pub fn remove(&self, listener: &Arc<L>) -> bool {
		let mut listeners = self.listeners.lock();
		let before = listeners.len();
		listeners.retain(|l| !Arc::ptr_eq(l, listener));
		listeners.len() < before
	}

	pub fn is_empty(&self) -> bool {
		self.listeners.lock().is_empty()
	}

	/// Snapshot of the current handles, in registration order.
	pub fn snapshot(&self) -> Vec<Arc<L>> {
		self.listeners.lock().clone()
	}

	/// Invokes `f` for every registered listener, regardless of earlier
	/// failures, and aggregates the failures into one [`FanoutError`].
	///
	/// A panic in a listener propagates immediately; remaining listeners
	/// are not invoked.
	pub fn safe_for_each<E>(&self, mut f: impl FnMut(&L) -> Result<(), E>) -> Result<(), FanoutError<E>> {
		let listeners = self.listeners.lock();
		let mut failures = Vec::new();
		for listener in listeners.iter() {
			if let Err(e) = f(listener) {
				failures.push(e);
			}
		}
		match FanoutError::from_failures(failures) {
			None => Ok(()),
			Some(error) => Err(error),
		}
	}
}

impl<L: ?Sized> Debug for ListenerSet<L> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("ListenerSet")
			.field("length", &self.listeners.lock().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex as PlMutex;

	/// Records its invocations and optionally fails with a fixed message.
	struct Probe {
		name: &'static str,
		fail_with: Option<&'static str>,
		calls: PlMutex<usize>,
	}

	impl Probe {
		fn new(name: &'static str, fail_with: Option<&'static str>) -> Arc<Probe> {
			Arc::new(Probe {
				name,
				fail_with,
				calls: PlMutex::new(0),
			})
		}

		fn poke(&self) -> Result<(), String> {
			*self.calls.lock() += 1;
			match self.fail_with {
				Some(message) => Err(format!("{}: {message}", self.name)),
				None => Ok(()),
			}
		}

		fn calls(&self) -> usize {
			*self.calls.lock()
		}
	}

	#[test]
	fn empty_set_is_a_no_op() {
		let set: ListenerSet<Probe> = ListenerSet::new();
		let result: Result<(), FanoutError<String>> = set.safe_for_each(|_| panic!("should not be called"));
		assert!(result.is_ok());
	}

	#[test]
	fn calls_listeners_in_registration_order() {
		let set = ListenerSet::new();
		let order = PlMutex::new(Vec::new());
		let l1 = Probe::new("l1", None);
		let l2 = Probe::new("l2", None);
		set.add(l1.clone());
		set.add(l2.clone());

		set
			.safe_for_each(|probe: &Probe| -> Result<(), String> {
				order.lock().push(probe.name);
				probe.poke()
			})
			.unwrap();
		assert_eq!(*order.lock(), vec!["l1", "l2"]);
	}

	#[test]
	fn add_deduplicates_by_identity() {
		let set = ListenerSet::new();
		let l1 = Probe::new("l1", None);
		set.add(l1.clone());
		set.add(l1.clone());
		set.safe_for_each(|probe| probe.poke()).unwrap();
		assert_eq!(l1.calls(), 1);
	}

	#[test]
	fn remove_by_identity() {
		let set = ListenerSet::new();
		let l1 = Probe::new("l1", None);
		let l2 = Probe::new("l2", None);
		set.add(l1.clone());
		set.add(l2.clone());
		assert!(set.remove(&l1));
		assert!(!set.remove(&l1));

		set.safe_for_each(|probe| probe.poke()).unwrap();
		assert_eq!(l1.calls(), 0);
		assert_eq!(l2.calls(), 1);
	}

	#[test]
	fn single_failure_is_the_primary_error() {
		let set = ListenerSet::new();
		let l1 = Probe::new("l1", Some("boom"));
		set.add(l1.clone());

		let error = set.safe_for_each(|probe| probe.poke()).unwrap_err();
		assert_eq!(error.primary, "l1: boom");
		assert!(error.suppressed.is_empty());
	}

	#[test]
	fn failure_does_not_prevent_later_listeners() {
		let set = ListenerSet::new();
		let l1 = Probe::new("l1", Some("boom"));
		let l2 = Probe::new("l2", None);
		set.add(l1.clone());
		set.add(l2.clone());

		let error = set.safe_for_each(|probe| probe.poke()).unwrap_err();
		assert_eq!(error.primary, "l1: boom");
		assert_eq!(l2.calls(), 1);
	}

	#[test]
	fn last_failure_wins_with_earlier_failures_suppressed() {
		let set = ListenerSet::new();
		let l1 = Probe::new("l1", Some("first"));
		let l2 = Probe::new("l2", None);
		let l3 = Probe::new("l3", Some("last"));
		set.add(l1.clone());
		set.add(l2.clone());
		set.add(l3.clone());

		let error = set.safe_for_each(|probe| probe.poke()).unwrap_err();
		assert_eq!(error.primary, "l3: last");
		assert_eq!(error.suppressed, vec!["l1: first".to_string()]);
		assert_eq!(l2.calls(), 1);
	}

	#[test]
	fn display_mentions_suppressed_count() {
		let error = FanoutError {
			primary: "last".to_string(),
			suppressed: vec!["first".to_string()],
		};
		assert_eq!(format!("{error}"), "last (1 earlier listener failure(s) suppressed)");
	}
}
