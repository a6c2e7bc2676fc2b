use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use conference_registration::clock::{Clock, SystemClock};
use conference_registration::config::RegistrationConfig;
use conference_registration::domain::registration::{
    AssignRegistrantDetails, ConferenceAlias, RegisterToConference, RegistrationOutcome,
    RegistrationSaga, SagaSettings, SeatQuantity, THIRD_PARTY_PROCESSOR_PAYMENT,
};
use conference_registration::messaging::{CommandDispatcher, InMemoryCommandBus, RedpandaCommandBus};
use conference_registration::metrics::{self, Metrics};
use conference_registration::read_model::{InMemoryReadModel, SeatType};
use conference_registration::simulation::ReservationProjector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=conference_registration=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,conference_registration=debug")),
        )
        .init();

    tracing::info!("🚀 Starting conference registration demo");

    let config = RegistrationConfig::load()?;
    tracing::debug!(?config, "Configuration loaded");

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    if config.metrics.enabled {
        let metrics_registry = Arc::new(metrics.registry().clone());
        let port = config.metrics.port;
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Metrics runtime error: {}", e);
                    return;
                }
            };
            rt.block_on(async {
                if let Err(e) = metrics::start_metrics_server(metrics_registry, port).await {
                    tracing::error!("Metrics server error: {}", e);
                }
            });
        });
    }

    // === 2. Read model and conference catalog ===
    let read_model = InMemoryReadModel::new();
    let conference = ConferenceAlias::new(Uuid::new_v4(), "rustconf", "RustConf 2026");
    let general = SeatType {
        id: Uuid::new_v4(),
        conference_id: conference.id,
        name: "General".to_string(),
        description: "Full conference pass".to_string(),
        price: Decimal::new(14999, 2),
        available_quantity: 100,
    };
    let community = SeatType {
        id: Uuid::new_v4(),
        conference_id: conference.id,
        name: "Community".to_string(),
        description: "Sponsored community pass".to_string(),
        price: Decimal::ZERO,
        available_quantity: 3,
    };
    read_model
        .publish_seat_types(conference.id, vec![general.clone(), community.clone()])
        .await;

    // === 3. Command bus ===
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let command_bus: Arc<dyn CommandDispatcher> = match &config.messaging.brokers {
        Some(brokers) => Arc::new(RedpandaCommandBus::new(brokers, &config.messaging.topic)?),
        None => {
            tracing::info!("No brokers configured, projecting commands in process");
            let (bus, receiver) = InMemoryCommandBus::with_subscriber();
            let projector = ReservationProjector::new(
                read_model.clone(),
                clock.clone(),
                chrono::Duration::minutes(config.simulation.reservation_hold_minutes),
                Duration::from_millis(config.simulation.projection_delay_ms),
            );
            tokio::spawn(projector.run(receiver));
            Arc::new(bus)
        }
    };

    let saga = RegistrationSaga::new(
        command_bus,
        Arc::new(read_model.clone()),
        Arc::new(read_model.clone()),
        clock,
        metrics.clone(),
        SagaSettings::from_config(&config)?,
    );

    // === 4. Paid order, handed off to the payment processor ===
    tracing::info!("📝 Registering a paid order");
    let registrant = ("Ada", "Lovelace", "ada@example.org");
    register(&saga, &conference, SeatQuantity::new(general.id, 2), registrant).await?;

    // === 5. Free order, confirmed directly ===
    tracing::info!("📝 Registering a free order");
    let registrant = ("Alan", "Turing", "alan@example.org");
    register(&saga, &conference, SeatQuantity::new(community.id, 1), registrant).await?;

    // Let the projector catch up before exiting
    tokio::time::sleep(Duration::from_millis(config.simulation.projection_delay_ms * 2)).await;

    tracing::info!("🎉 Demo complete!");
    Ok(())
}

/// Walk one order through both stages
async fn register(
    saga: &RegistrationSaga,
    conference: &ConferenceAlias,
    seats: SeatQuantity,
    (first_name, last_name, email): (&str, &str, &str),
) -> anyhow::Result<()> {
    let RegistrationOutcome::ReservationEditor(editor) =
        saga.start_registration(conference, None).await?
    else {
        anyhow::bail!("Seat selection did not open");
    };
    let order_id = editor.order_id;

    let outcome = saga
        .submit_reservation(
            conference,
            RegisterToConference::new(order_id, vec![seats]),
            editor.order_version,
        )
        .await?;
    let RegistrationOutcome::RedirectToRegistrant { order_version, .. } = outcome else {
        tracing::warn!(order_id = %order_id, outcome = outcome.label(), "Reservation not accepted");
        return Ok(());
    };

    let outcome = saga
        .specify_registrant_and_payment_details(conference, order_id, order_version)
        .await?;
    let RegistrationOutcome::RegistrantEditor(form) = outcome else {
        tracing::warn!(order_id = %order_id, outcome = outcome.label(), "Registrant form unavailable");
        return Ok(());
    };
    tracing::info!(order_id = %order_id, total = %form.order.total, "✅ Order priced");

    let details = AssignRegistrantDetails {
        order_id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
    };
    let outcome = saga
        .submit_registrant_and_payment_details(
            conference,
            details,
            THIRD_PARTY_PROCESSOR_PAYMENT,
            form.order_version,
        )
        .await?;

    match outcome {
        RegistrationOutcome::PaymentHandoff(handoff) => {
            tracing::info!(
                order_id = %order_id,
                payment_id = %handoff.payment_id,
                redirect = %handoff.redirect_url,
                "💳 Redirecting to payment processor"
            );
        }
        other => {
            tracing::info!(order_id = %order_id, outcome = other.label(), "✅ Registration finished");
        }
    }

    Ok(())
}
