// self
use crate::obs::{OpKind, OpOutcome};

/// Counts one `outcome` for `kind` under `market_auth_client_op_total`.
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"market_auth_client_op_total",
		"op" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Counts a caller that awaited an in-flight refresh instead of starting one.
pub fn record_refresh_join() {
	#[cfg(feature = "metrics")]
	metrics::counter!("market_auth_client_refresh_joins_total").increment(1);
}
