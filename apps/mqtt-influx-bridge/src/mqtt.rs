use crate::bridge::Bridge;
use crate::config::Config;
use crate::sink::StorageBackend;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio::time::{sleep, Duration};

fn mqtt_options(config: &Config) -> MqttOptions {
    let mut mqttoptions = MqttOptions::new(
        config.mqtt_client_id.clone(),
        config.mqtt_host.clone(),
        config.mqtt_port,
    );
    mqttoptions.set_keep_alive(config.mqtt_keepalive());
    if let Some(username) = &config.mqtt_username {
        mqttoptions.set_credentials(
            username.clone(),
            config.mqtt_password.clone().unwrap_or_default(),
        );
    }
    mqttoptions
}

/// Subscribes to the configured pattern and feeds every publish through the
/// bridge, one message at a time. Never returns; connection loss recreates
/// the client and subscribes again.
pub async fn run_listener<B: StorageBackend>(config: &Config, bridge: &Bridge<B>) {
    loop {
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(config), 32);

        if let Err(err) = client
            .subscribe(config.mqtt_topic.clone(), QoS::AtMostOnce)
            .await
        {
            tracing::warn!(error=%err, "failed to subscribe to MQTT; retrying");
            sleep(Duration::from_secs(2)).await;
            continue;
        }

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                    tracing::info!(
                        host=%config.mqtt_host,
                        port=config.mqtt_port,
                        code=?ack.code,
                        topic=%config.mqtt_topic,
                        "connected to MQTT broker"
                    );
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    bridge.handle_message(&publish.topic, &publish.payload).await;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error=%err, "MQTT connection dropped; reconnecting");
                    break;
                }
            }
        }

        sleep(Duration::from_secs(1)).await;
    }
}
