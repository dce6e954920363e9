use std::error::Error;
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Conditions that end a pipeline invocation with a failure response.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("history store error: {0}")]
    History(BoxError),

    #[error("chat model call failed: {0}")]
    Model(BoxError),

    #[error("chat model returned an empty reply")]
    EmptyReply,

    #[error("no recorded model response to replay")]
    NothingToReplay,

    #[error("model reply has no parseable post JSON block")]
    MalformedPost,

    #[error("model reply has no parseable image prompt block")]
    MalformedDirectives,

    #[error("duplicate check for slug '{slug}' failed: {source}")]
    DuplicateCheck {
        slug: String,
        #[source]
        source: BoxError,
    },

    #[error("publishing post failed: {0}")]
    Publish(BoxError),
}
