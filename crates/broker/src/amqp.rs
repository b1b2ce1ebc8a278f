//! AMQP transport implementation on `lapin`
//!
//! One connection, one channel. Queue declarations use the broker's
//! idempotent declare; publishes go to the default exchange with the queue
//! name as routing key. The connection's error callback feeds the close
//! signal the lifecycle task parks on.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::transport::{BrokerChannel, BrokerEndpoint, BrokerLink, BrokerTransport, TransportError};

/// AMQP broker transport
#[derive(Debug, Default)]
pub struct AmqpTransport;

impl AmqpTransport {
    /// Create the transport
    pub fn new() -> Self {
        Self
    }
}

/// A live AMQP channel
///
/// Holds the connection alongside the channel: dropping this closes both,
/// which is how a failed session is torn down for retry.
pub struct AmqpChannel {
    channel: lapin::Channel,
    _connection: Connection,
}

#[async_trait]
impl BrokerTransport for AmqpTransport {
    type Channel = AmqpChannel;

    async fn connect(
        &self,
        endpoint: &BrokerEndpoint,
    ) -> Result<BrokerLink<Self::Channel>, TransportError> {
        let uri = endpoint.amqp_uri();

        let connection = Connection::connect(&uri, ConnectionProperties::default())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        // lapin reports both async errors and peer-initiated closes through
        // this callback; the first one wins the oneshot.
        let (closed_tx, closed_rx) = oneshot::channel();
        let closed_tx = Mutex::new(Some(closed_tx));
        connection.on_error(move |err| {
            if let Some(tx) = closed_tx.lock().take() {
                let _ = tx.send(TransportError::Closed(err.to_string()));
            }
        });

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| TransportError::Channel(e.to_string()))?;

        Ok(BrokerLink {
            channel: AmqpChannel {
                channel,
                _connection: connection,
            },
            closed: closed_rx,
        })
    }
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    async fn ensure_queue(&self, queue: &str) -> Result<(), TransportError> {
        self.channel
            .queue_declare(queue, QueueDeclareOptions::default(), FieldTable::default())
            .await
            .map_err(|e| TransportError::Declare {
                queue: queue.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), TransportError> {
        // Fire-and-forget: await the transport accepting the frame, not the
        // publisher confirm - delivery here is at-most-once.
        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| TransportError::Publish {
                queue: queue.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
