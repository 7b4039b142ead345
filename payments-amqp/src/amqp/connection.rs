use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use lapin::{
    options::{
        BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection,
};
use payments_amqp_core::{BindingDescriptor, ExchangeDescriptor, ExchangeKind, QueueDescriptor};
use tracing::debug;

use super::{Error, Result};
use crate::connection::{BrokerConnection, Delivery, DeliveryStream};

/// AMQP reply code for a normal shutdown
const REPLY_SUCCESS: u16 = 200;

/// An AMQP connection along with the channel used to talk to the broker
pub struct AmqpConnection {
    connection: Connection,
    channel: Channel,
}

impl AmqpConnection {
    pub(crate) fn new(connection: Connection, channel: Channel) -> Self {
        Self {
            connection,
            channel,
        }
    }

    /// The underlying channel
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }
}

fn exchange_kind(kind: ExchangeKind) -> lapin::ExchangeKind {
    match kind {
        ExchangeKind::Direct => lapin::ExchangeKind::Direct,
        ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
        ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        ExchangeKind::Headers => lapin::ExchangeKind::Headers,
    }
}

impl From<lapin::message::Delivery> for Delivery {
    fn from(delivery: lapin::message::Delivery) -> Self {
        Self {
            exchange: delivery.exchange.as_str().to_string(),
            routing_key: delivery.routing_key.as_str().to_string(),
            payload: delivery.data,
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
        }
    }
}

#[async_trait]
impl BrokerConnection for AmqpConnection {
    type Err = Error;

    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> Result<()> {
        self.ensure_open()?;

        let options = ExchangeDeclareOptions {
            durable: exchange.durable,
            auto_delete: exchange.auto_delete,
            ..Default::default()
        };

        self.channel
            .exchange_declare(
                &exchange.name,
                exchange_kind(exchange.kind),
                options,
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    async fn declare_queue(&self, queue: &QueueDescriptor) -> Result<()> {
        self.ensure_open()?;

        let options = QueueDeclareOptions {
            durable: queue.durable,
            exclusive: queue.exclusive,
            auto_delete: queue.auto_delete,
            ..Default::default()
        };

        self.channel
            .queue_declare(&queue.name, options, FieldTable::default())
            .await?;
        Ok(())
    }

    async fn declare_binding(&self, binding: &BindingDescriptor) -> Result<()> {
        self.ensure_open()?;

        self.channel
            .queue_bind(
                &binding.queue,
                &binding.exchange,
                &binding.key.to_string(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;

        debug!(
            "publishing {} byte(s) to '{exchange}' with '{routing_key}'",
            payload.len()
        );
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await?
            .await?;
        Ok(())
    }

    async fn consume(&self, queue: &str, consumer_tag: &str) -> Result<DeliveryStream<Error>> {
        self.ensure_open()?;

        let options = BasicConsumeOptions {
            no_ack: true,
            ..Default::default()
        };

        let consumer = self
            .channel
            .basic_consume(queue, consumer_tag, options, FieldTable::default())
            .await?;

        Ok(consumer
            .map_ok(Delivery::from)
            .map_err(Error::from)
            .boxed())
    }

    async fn close(&self) -> Result<()> {
        if self.connection.status().connected() {
            self.connection.close(REPLY_SUCCESS, "OK").await?;
        }
        Ok(())
    }
}
