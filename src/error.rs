use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("json decode error: {0}")]
    SimdJson(#[from] simd_json::Error),
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),
    #[error("logger install error: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("insufficient funds: need {required:.4}, have {available:.4}")]
    InsufficientFunds { required: f64, available: f64 },
    #[error("wallet is not connected")]
    WalletNotConnected,
}
