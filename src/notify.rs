use tokio::net::UdpSocket;
use tracing::info;

use crate::error::ReportError;
use crate::models::EmergencyAlert;

/// Fire-and-forget broadcast of an `EMERGENCIA` alert as a single JSON
/// datagram. An unreachable or unconfigured publisher is a `Publish` error,
/// kept separate from the computation taxonomy.
pub async fn publish_emergency(addr: &str, alert: &EmergencyAlert) -> Result<(), ReportError> {
    let payload = serde_json::to_vec(alert)
        .map_err(|err| ReportError::Publish(format!("cannot encode alert: {err}")))?;

    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|err| ReportError::Publish(format!("cannot open socket: {err}")))?;

    socket
        .send_to(&payload, addr)
        .await
        .map_err(|err| ReportError::Publish(format!("cannot reach {addr}: {err}")))?;

    info!(topic = alert.topic, id = alert.id, "emergency alert published");
    Ok(())
}
