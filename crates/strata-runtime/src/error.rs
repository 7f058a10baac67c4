use std::thread::ThreadId;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),
    #[error("VBO updates are bound to thread {expected:?} but were requested from {actual:?}")]
    WrongRenderThread { expected: ThreadId, actual: ThreadId },
    #[error("failed to build chunk worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}
