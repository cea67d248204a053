//! Navigation side effect fired when a session cannot be recovered.

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use crate::_prelude::*;

/// Sends the user agent to the login location after credentials are cleared.
pub trait LoginRedirect
where
	Self: Send + Sync,
{
	/// Navigates to `login_url`.
	fn redirect_to_login(&self, login_url: &Url);
}

/// Redirect that does nothing, for headless callers.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRedirect;
impl LoginRedirect for NoopRedirect {
	fn redirect_to_login(&self, _: &Url) {}
}

/// Redirect backed by a caller-supplied callback.
pub struct CallbackRedirect<F>(F);
impl<F> CallbackRedirect<F>
where
	F: Fn(&Url) + Send + Sync,
{
	/// Wraps `callback`.
	pub fn new(callback: F) -> Self {
		Self(callback)
	}
}
impl<F> LoginRedirect for CallbackRedirect<F>
where
	F: Fn(&Url) + Send + Sync,
{
	fn redirect_to_login(&self, login_url: &Url) {
		(self.0)(login_url)
	}
}
impl<F> Debug for CallbackRedirect<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CallbackRedirect(..)")
	}
}

/// Redirect that records every navigation; useful for tests and for polling UIs.
#[derive(Debug, Default)]
pub struct RecordingRedirect {
	count: AtomicUsize,
	last: Mutex<Option<Url>>,
}
impl RecordingRedirect {
	/// Number of redirects fired so far.
	pub fn count(&self) -> usize {
		self.count.load(Ordering::SeqCst)
	}

	/// Most recent login location, if any redirect fired.
	pub fn last(&self) -> Option<Url> {
		self.last.lock().clone()
	}
}
impl LoginRedirect for RecordingRedirect {
	fn redirect_to_login(&self, login_url: &Url) {
		*self.last.lock() = Some(login_url.clone());

		self.count.fetch_add(1, Ordering::SeqCst);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_redirect_counts_navigations() {
		let redirect = RecordingRedirect::default();
		let login = Url::parse("https://market.example.com/login").expect("Fixture URL should parse.");

		assert_eq!(redirect.count(), 0);

		redirect.redirect_to_login(&login);
		redirect.redirect_to_login(&login);

		assert_eq!(redirect.count(), 2);
		assert_eq!(redirect.last(), Some(login));
	}

	#[test]
	fn callback_redirect_invokes_closure() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let redirect = CallbackRedirect::new(move |url: &Url| sink.lock().push(url.to_string()));

		redirect.redirect_to_login(&Url::parse("http://localhost/login").expect("URL"));

		assert_eq!(seen.lock().as_slice(), ["http://localhost/login"]);
	}
}
