//! Exchange Port - Read-only Exchange Client Interface
//!
//! Defines what the polling adapter needs from an exchange: a way to
//! open a session from credentials, and three read-only queries on
//! that session. No order placement, no fund movement.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BalanceRecord, Credentials, TickerRecord};

/// Failures reported by exchange adapters.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
  /// The exchange could not be reached while opening a session.
  #[error("cannot connect to {host}: {message}")]
  Connection {
    /// Exchange host name.
    host: String,
    /// Underlying failure.
    message: String,
  },
  /// The exchange rejected the API key, secret, or signature.
  #[error("authentication rejected (code {code}): {message}")]
  Authentication {
    /// Exchange error code (0 when only the HTTP status is known).
    code: i64,
    /// Exchange error message.
    message: String,
  },
  /// The request timestamp fell outside the exchange's receive window;
  /// the signing clock has drifted and must be re-synced.
  #[error("request timestamp rejected (code {code}): {message}")]
  ClockSkew {
    /// Exchange error code.
    code: i64,
    /// Exchange error message.
    message: String,
  },
  /// The requested trading pair does not exist.
  #[error("unknown symbol {symbol}")]
  UnknownSymbol {
    /// Pair that was looked up.
    symbol: String,
  },
  /// Any other non-success response.
  #[error("API error {status} (code {code:?}): {message}")]
  Api {
    /// HTTP status code.
    status: u16,
    /// Exchange error code, when the body carried one.
    code: Option<i64>,
    /// Exchange error message or raw body.
    message: String,
  },
  /// Network failure or timeout after the session was opened.
  #[error("transport error: {0}")]
  Transport(String),
  /// The response body did not have the expected shape.
  #[error("invalid response: {0}")]
  Decode(String),
}

impl ExchangeError {
  /// Whether the session should be discarded and re-established.
  pub fn invalidates_session(&self) -> bool {
    matches!(
      self,
      Self::Authentication { .. } | Self::Connection { .. } | Self::ClockSkew { .. }
    )
  }
}

/// Opens exchange sessions.
#[async_trait]
pub trait ExchangeConnector: Send + Sync + 'static {
  /// Establish a session with the given credentials.
  ///
  /// Fails with `Connection` when the exchange is unreachable and with
  /// `Authentication` when it rejects the request.
  async fn connect(
    &self,
    credentials: &Credentials,
  ) -> Result<Arc<dyn ExchangeClient>, ExchangeError>;
}

/// Read-only queries against an open exchange session.
#[async_trait]
pub trait ExchangeClient: Send + Sync + 'static {
  /// Every asset balance of the account, including zero balances.
  async fn account_balances(&self) -> Result<Vec<BalanceRecord>, ExchangeError>;

  /// Last price of every listed trading pair.
  async fn all_tickers(&self) -> Result<Vec<TickerRecord>, ExchangeError>;

  /// Last price of one trading pair.
  ///
  /// Returns `UnknownSymbol` when the pair is not listed.
  async fn ticker(&self, pair: &str) -> Result<TickerRecord, ExchangeError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_session_invalidation() {
    let auth = ExchangeError::Authentication {
      code: -2015,
      message: "Invalid API-key".to_string(),
    };
    assert!(auth.invalidates_session());
    let skew = ExchangeError::ClockSkew {
      code: -1021,
      message: "Timestamp for this request is outside of the recvWindow.".to_string(),
    };
    assert!(skew.invalidates_session());
    assert!(!ExchangeError::Transport("timeout".to_string()).invalidates_session());
    assert!(
      !ExchangeError::UnknownSymbol {
        symbol: "FOOBAR".to_string()
      }
      .invalidates_session()
    );
  }

  #[test]
  fn test_error_display() {
    let err = ExchangeError::Api {
      status: 418,
      code: Some(-1003),
      message: "IP banned".to_string(),
    };
    assert_eq!(err.to_string(), "API error 418 (code Some(-1003)): IP banned");
  }
}
