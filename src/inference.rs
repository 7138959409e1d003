use futures::Stream;
use std::future::Future;
use std::pin::Pin;

use crate::error::InvocationError;
use crate::model::Message;

/// One model call: the whole conversation plus sampling settings.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub messages: &'a [Message],
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

/// Non-empty text increments in arrival order. Finite and not restartable.
pub type FragmentStream<'a> = Pin<Box<dyn Stream<Item = Result<String, InvocationError>> + 'a>>;

pub type InferenceFuture<'a> =
    Pin<Box<dyn Future<Output = Result<FragmentStream<'a>, InvocationError>> + 'a>>;

pub trait InferenceClient {
    /// Starts a completion. With `stream` unset the full text arrives as a single fragment.
    fn generate<'a>(&'a self, request: GenerationRequest<'a>) -> InferenceFuture<'a>;

    fn model(&self) -> &str;
}

impl<C> InferenceClient for &C
where
    C: InferenceClient + ?Sized,
{
    fn generate<'a>(&'a self, request: GenerationRequest<'a>) -> InferenceFuture<'a> {
        (**self).generate(request)
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}
