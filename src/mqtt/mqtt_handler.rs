use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

use super::message_manager::InboundMessage;
use super::{Connector, PubSub};
use crate::error::{SessionError, SessionFault};

/// Request queue depth between the client handle and the event loop
const REQUEST_CAPACITY: usize = 10;

/// Opens rumqttc sessions and waits for the broker's CONNACK.
#[derive(Debug, Clone)]
pub struct MqttConnector {
    open_timeout: Duration,
}

impl MqttConnector {
    pub fn new(open_timeout: Duration) -> Self {
        Self { open_timeout }
    }
}

impl Connector for MqttConnector {
    type Session = MqttSession;

    async fn open(&mut self, options: MqttOptions) -> Result<MqttSession, SessionError> {
        let (host, port) = options.broker_address();
        debug!("Opening MQTT session to {}:{}", host, port);

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let deadline = Instant::now() + self.open_timeout;

        loop {
            match timeout_at(deadline, eventloop.poll()).await {
                Err(_) => return Err(SessionError::Timeout(self.open_timeout)),
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    if ack.code == ConnectReturnCode::Success {
                        debug!(
                            "CONNACK from {}:{} (session present: {})",
                            host, port, ack.session_present
                        );
                        break;
                    }
                    return Err(SessionError::Refused(format!("{:?}", ack.code)));
                }
                Ok(Ok(event)) => trace!("Event before CONNACK: {:?}", event),
                Ok(Err(ConnectionError::ConnectionRefused(code))) => {
                    return Err(SessionError::Refused(format!("{:?}", code)))
                }
                Ok(Err(e)) => return Err(SessionError::Connection(e.to_string())),
            }
        }

        Ok(MqttSession { client, eventloop })
    }
}

/// A live rumqttc session. Dropping it closes the connection without a
/// DISCONNECT, so the broker fires the last will.
pub struct MqttSession {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl PubSub for MqttSession {
    /// Queues the request without waiting. Only `poll` drains the queue and it
    /// runs on this same task, so a full queue is a session fault.
    async fn subscribe(&mut self, topic: &str) -> Result<(), SessionFault> {
        self.client
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| SessionFault::Client(e.to_string()))
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), SessionFault> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, true, payload.as_bytes().to_vec())
            .map_err(|e| SessionFault::Client(e.to_string()))
    }

    /// One event loop step. Acks, pings and outgoing notifications yield an
    /// empty batch; keep-alive pings bound how long this can wait.
    async fn next_batch(&mut self) -> Result<Vec<InboundMessage>, SessionFault> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                Ok(vec![InboundMessage::from_publish(&publish)])
            }
            Ok(Event::Incoming(Packet::Disconnect)) => Err(SessionFault::Disconnected),
            Ok(event) => {
                trace!("MQTT event: {:?}", event);
                Ok(Vec::new())
            }
            Err(e) => Err(SessionFault::Connection(e.to_string())),
        }
    }
}
