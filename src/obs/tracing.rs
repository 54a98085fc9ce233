// self
use crate::_prelude::*;

/// Future instrumented with a [`FetchSpan`].
pub type InstrumentedFetch<F> = tracing::instrument::Instrumented<F>;

/// Span wrapping one pipeline stage for a data type.
#[derive(Clone, Debug)]
pub struct FetchSpan {
	span: tracing::Span,
}
impl FetchSpan {
	/// Creates a new span tagged with the data type + stage.
	pub fn new(data_type: &str, stage: &'static str) -> Self {
		let span = tracing::info_span!("monalytics_loader.fetch", data_type, stage);

		Self { span }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFetch<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}
