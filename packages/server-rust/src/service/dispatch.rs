//! Multicast delivery of routed messages to their recipients.

use async_trait::async_trait;
use dynrouter_core::Message;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::warn;

use super::config::DispatchOptions;

/// Hands a message to one endpoint. Implemented by the host's transport.
#[async_trait]
pub trait EndpointDispatcher: Send + Sync {
    /// Delivers `message` to `endpoint`.
    ///
    /// # Errors
    ///
    /// Any transport failure; the pipeline decides whether it is fatal.
    async fn deliver(&self, endpoint: &str, message: Message) -> anyhow::Result<()>;
}

/// A delivery that failed with `stop_on_exception` set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("delivery to {endpoint} failed: {reason}")]
pub struct DispatchError {
    pub endpoint: String,
    pub reason: String,
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub endpoint: String,
    /// `None` on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryReport {
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Delivers a clone of `message` to every recipient, in recipient order.
///
/// Sequential delivery stops at the first failure when `stop_on_exception`
/// is set. Parallel delivery always attempts every recipient and then
/// reports the first failure in recipient order.
///
/// # Errors
///
/// [`DispatchError`] for the first failed delivery, only with
/// `stop_on_exception`. Otherwise failures are logged and reported.
pub async fn dispatch_all(
    dispatcher: &dyn EndpointDispatcher,
    recipients: &[String],
    message: &Message,
    options: DispatchOptions,
) -> Result<Vec<DeliveryReport>, DispatchError> {
    let results = if options.parallel_processing {
        join_all(
            recipients
                .iter()
                .map(|endpoint| dispatcher.deliver(endpoint, message.clone())),
        )
        .await
    } else {
        let mut results = Vec::with_capacity(recipients.len());
        for endpoint in recipients {
            let result = dispatcher.deliver(endpoint, message.clone()).await;
            let failed = result.is_err();
            results.push(result);
            if failed && options.stop_on_exception {
                break;
            }
        }
        results
    };

    let mut reports = Vec::with_capacity(results.len());
    for (endpoint, result) in recipients.iter().zip(results) {
        let error = match result {
            Ok(()) => None,
            Err(err) => {
                let reason = format!("{err:#}");
                if options.stop_on_exception {
                    return Err(DispatchError {
                        endpoint: endpoint.clone(),
                        reason,
                    });
                }
                warn!(endpoint = %endpoint, error = %reason, "delivery failed");
                Some(reason)
            }
        };
        reports.push(DeliveryReport {
            endpoint: endpoint.clone(),
            error,
        });
    }
    Ok(reports)
}
