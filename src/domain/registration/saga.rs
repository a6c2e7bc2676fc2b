use std::sync::Arc;

use url::Url;
use uuid::Uuid;

use super::commands::{
    AssignRegistrantDetails, ConfirmOrder, InitiateThirdPartyProcessorPayment, RegisterToConference,
    RegistrationCommand,
};
use super::errors::{RegistrationError, ValidationError};
use super::outcomes::{PaymentHandoff, RegistrantEditor, RegistrationOutcome, ReservationEditor};
use super::payment::{resolve_payment_branch, PaymentBranch};
use super::value_objects::ConferenceAlias;
use super::views::assemble_order_view;
use crate::clock::Clock;
use crate::config::RegistrationConfig;
use crate::messaging::CommandDispatcher;
use crate::metrics::Metrics;
use crate::read_model::{ConferenceDao, DraftOrder, DraftOrderState, OrderDao, PricedOrder};
use crate::utils::{poll_until, PollOutcome, PollProfile};

pub type Result<T> = std::result::Result<T, RegistrationError>;

// ============================================================================
// Registration Saga - Drives an order from seat selection to confirmation
// ============================================================================
//
// Stateless: every call re-derives where the order stands from the read
// model plus the version the caller carries. Commands go out through the
// bus and are never awaited; the next step polls for their effect.
//
//   Stage A: seat reservation     start_registration / submit_reservation
//   Stage B: registrant & payment specify_registrant_and_payment_details /
//                                 submit_registrant_and_payment_details
//
// Version rule: a draft or priced order only counts as the answer to a
// command if its version is strictly greater than the caller's baseline.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct SagaSettings {
    pub reservation_profile: PollProfile,
    pub pricing_profile: PollProfile,
    pub max_seats_per_line: i32,
    /// Path prefix for callback URLs; query and fragment are stripped
    pub public_base_url: Url,
}

impl SagaSettings {
    pub fn new(
        reservation_profile: PollProfile,
        pricing_profile: PollProfile,
        max_seats_per_line: i32,
        mut public_base_url: Url,
    ) -> Self {
        public_base_url.set_query(None);
        public_base_url.set_fragment(None);

        Self {
            reservation_profile,
            pricing_profile,
            max_seats_per_line,
            public_base_url,
        }
    }

    pub fn from_config(config: &RegistrationConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.reservation_profile(),
            config.pricing_profile(),
            config.registration.max_seats_per_line,
            config.public_base_url()?,
        ))
    }
}

pub struct RegistrationSaga {
    command_bus: Arc<dyn CommandDispatcher>,
    orders: Arc<dyn OrderDao>,
    conferences: Arc<dyn ConferenceDao>,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    settings: SagaSettings,
}

impl RegistrationSaga {
    pub fn new(
        command_bus: Arc<dyn CommandDispatcher>,
        orders: Arc<dyn OrderDao>,
        conferences: Arc<dyn ConferenceDao>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        settings: SagaSettings,
    ) -> Self {
        Self {
            command_bus,
            orders,
            conferences,
            clock,
            metrics,
            settings,
        }
    }

    // ------------------------------------------------------------------------
    // Stage A - seat reservation
    // ------------------------------------------------------------------------

    /// Open the seat selection for a new order, or resume an existing one
    pub async fn start_registration(
        &self,
        conference: &ConferenceAlias,
        order_id: Option<Uuid>,
    ) -> Result<RegistrationOutcome> {
        let result = self.start_registration_inner(conference, order_id).await;
        self.observe("start_registration", order_id, result)
    }

    async fn start_registration_inner(
        &self,
        conference: &ConferenceAlias,
        order_id: Option<Uuid>,
    ) -> Result<RegistrationOutcome> {
        let Some(order_id) = order_id else {
            let seat_types = self.conferences.get_published_seat_types(conference.id).await?;
            return Ok(RegistrationOutcome::ReservationEditor(ReservationEditor {
                order_id: Uuid::new_v4(),
                order_version: 0,
                expiration: None,
                view: assemble_order_view(conference, &seat_types, None, self.settings.max_seats_per_line),
                errors: vec![],
            }));
        };

        // Resuming: any settled projection of this order will do
        let Some(order) = self.wait_until_seats_are_confirmed(order_id, 0).await? else {
            return Ok(reservation_unknown(conference, order_id));
        };

        if let Some(outcome) = self.terminal_outcome(conference, &order) {
            return Ok(outcome);
        }

        let seat_types = self.conferences.get_published_seat_types(conference.id).await?;
        Ok(RegistrationOutcome::ReservationEditor(ReservationEditor {
            order_id,
            order_version: order.order_version,
            expiration: order.reservation_expiration_date,
            view: assemble_order_view(
                conference,
                &seat_types,
                Some(&order),
                self.settings.max_seats_per_line,
            ),
            errors: vec![],
        }))
    }

    /// Send the seat request and move on to Stage B without waiting for it
    pub async fn submit_reservation(
        &self,
        conference: &ConferenceAlias,
        command: RegisterToConference,
        order_version: i64,
    ) -> Result<RegistrationOutcome> {
        let order_id = command.order_id;
        let result = self.submit_reservation_inner(conference, command, order_version).await;
        self.observe("submit_reservation", Some(order_id), result)
    }

    async fn submit_reservation_inner(
        &self,
        conference: &ConferenceAlias,
        mut command: RegisterToConference,
        order_version: i64,
    ) -> Result<RegistrationOutcome> {
        let seat_types = self.conferences.get_published_seat_types(conference.id).await?;

        if let Err(errors) = command.validate(&seat_types, self.settings.max_seats_per_line) {
            tracing::warn!(
                order_id = %command.order_id,
                errors = errors.len(),
                "Rejected seat reservation request"
            );
            return self
                .show_registration_editor(conference, command.order_id, order_version, errors)
                .await;
        }

        command.conference_id = conference.id;
        let order_id = command.order_id;
        self.dispatch(vec![RegistrationCommand::RegisterToConference(command)])
            .await?;

        Ok(RegistrationOutcome::RedirectToRegistrant {
            conference_code: conference.code.clone(),
            order_id,
            order_version,
        })
    }

    /// Redisplay the seat selection after a rejected submission. Reads the
    /// draft once (no polling) when the caller knows of an earlier version.
    async fn show_registration_editor(
        &self,
        conference: &ConferenceAlias,
        order_id: Uuid,
        order_version: i64,
        errors: Vec<ValidationError>,
    ) -> Result<RegistrationOutcome> {
        let existing = if order_version != 0 {
            self.orders.find_draft_order(order_id).await?
        } else {
            None
        };

        let seat_types = self.conferences.get_published_seat_types(conference.id).await?;
        let view = assemble_order_view(
            conference,
            &seat_types,
            existing.as_ref(),
            self.settings.max_seats_per_line,
        );

        Ok(RegistrationOutcome::ReservationEditor(ReservationEditor {
            order_id,
            order_version: existing.as_ref().map_or(order_version, |o| o.order_version),
            expiration: existing.and_then(|o| o.reservation_expiration_date),
            view,
            errors,
        }))
    }

    // ------------------------------------------------------------------------
    // Stage B - registrant and payment details
    // ------------------------------------------------------------------------

    /// Wait for the reservation and the pricing issued after `order_version`,
    /// then show the registrant form
    pub async fn specify_registrant_and_payment_details(
        &self,
        conference: &ConferenceAlias,
        order_id: Uuid,
        order_version: i64,
    ) -> Result<RegistrationOutcome> {
        let result = self
            .show_registrant_editor(conference, order_id, order_version, None, vec![])
            .await;
        self.observe("specify_registrant_and_payment_details", Some(order_id), result)
    }

    async fn show_registrant_editor(
        &self,
        conference: &ConferenceAlias,
        order_id: Uuid,
        order_version: i64,
        registrant: Option<AssignRegistrantDetails>,
        errors: Vec<ValidationError>,
    ) -> Result<RegistrationOutcome> {
        let Some(order) = self.wait_until_seats_are_confirmed(order_id, order_version).await? else {
            return Ok(reservation_unknown(conference, order_id));
        };

        if let Some(outcome) = self.terminal_outcome(conference, &order) {
            return Ok(outcome);
        }

        if order.state == DraftOrderState::PartiallyReserved {
            tracing::info!(
                order_id = %order_id,
                order_version = order.order_version,
                "Not every seat could be reserved, back to seat selection"
            );
            return Ok(RegistrationOutcome::RedirectToReservation {
                conference_code: conference.code.clone(),
                order_id,
                order_version: order.order_version,
            });
        }

        let Some(priced) = self.wait_until_order_is_priced(order_id, order_version).await? else {
            return Ok(reservation_unknown(conference, order_id));
        };

        Ok(RegistrationOutcome::RegistrantEditor(RegistrantEditor {
            order_id,
            order_version,
            expiration: order.reservation_expiration_date,
            registrant: registrant.unwrap_or_else(|| AssignRegistrantDetails::for_order(order_id)),
            order: priced,
            errors,
        }))
    }

    /// Record the registrant and settle the order: confirm it when free,
    /// hand over to the payment processor otherwise
    pub async fn submit_registrant_and_payment_details(
        &self,
        conference: &ConferenceAlias,
        details: AssignRegistrantDetails,
        payment_type: &str,
        order_version: i64,
    ) -> Result<RegistrationOutcome> {
        let order_id = details.order_id;
        let result = self
            .submit_registrant_inner(conference, details, payment_type, order_version)
            .await;
        self.observe("submit_registrant_and_payment_details", Some(order_id), result)
    }

    async fn submit_registrant_inner(
        &self,
        conference: &ConferenceAlias,
        details: AssignRegistrantDetails,
        payment_type: &str,
        order_version: i64,
    ) -> Result<RegistrationOutcome> {
        let order_id = details.order_id;

        if let Err(errors) = details.validate() {
            tracing::warn!(
                order_id = %order_id,
                errors = errors.len(),
                "Rejected registrant details"
            );
            return self
                .show_registrant_editor(conference, order_id, order_version, Some(details), errors)
                .await;
        }

        let order = self
            .orders
            .find_draft_order(order_id)
            .await?
            .ok_or(RegistrationError::OrderNotFound(order_id))?;

        if let Some(outcome) = self.terminal_outcome(conference, &order) {
            return Ok(outcome);
        }

        // Displayed in the previous step, so it is expected to be there
        let priced = self
            .orders
            .find_priced_order(order_id)
            .await?
            .ok_or(RegistrationError::PricedOrderNotFound(order_id))?;

        match resolve_payment_branch(priced.is_free_of_charge, payment_type) {
            PaymentBranch::NoPayment => self.complete_without_payment(conference, details).await,
            PaymentBranch::ThirdPartyProcessor => {
                self.complete_with_third_party_payment(conference, details, &priced, order_version)
                    .await
            }
            PaymentBranch::Invoice => Err(RegistrationError::InvoicePaymentNotSupported),
            PaymentBranch::Unsupported => {
                Err(RegistrationError::UnknownPaymentType(payment_type.to_string()))
            }
        }
    }

    async fn complete_without_payment(
        &self,
        conference: &ConferenceAlias,
        details: AssignRegistrantDetails,
    ) -> Result<RegistrationOutcome> {
        let order_id = details.order_id;

        self.dispatch(vec![
            RegistrationCommand::AssignRegistrantDetails(details),
            RegistrationCommand::ConfirmOrder(ConfirmOrder { order_id }),
        ])
        .await?;

        Ok(RegistrationOutcome::ThankYou {
            conference_code: conference.code.clone(),
            order_id,
        })
    }

    async fn complete_with_third_party_payment(
        &self,
        conference: &ConferenceAlias,
        details: AssignRegistrantDetails,
        priced: &PricedOrder,
        order_version: i64,
    ) -> Result<RegistrationOutcome> {
        let payment = InitiateThirdPartyProcessorPayment {
            payment_id: Uuid::new_v4(),
            conference_id: conference.id,
            payment_source_id: priced.order_id,
            description: format!("Registration for {}", conference.name),
            total_amount: priced.total,
        };
        let payment_id = payment.payment_id;

        let payment_accepted_url = self.url(
            &[conference.code.as_str(), "registration", "thank-you"],
            &[("orderId", priced.order_id.to_string())],
        )?;
        let payment_rejected_url = self.url(
            &[conference.code.as_str(), "registration", "registrant"],
            &[
                ("orderId", priced.order_id.to_string()),
                ("orderVersion", order_version.to_string()),
            ],
        )?;
        let redirect_url = self.url(
            &[conference.code.as_str(), "payment", "third-party"],
            &[
                ("paymentId", payment_id.to_string()),
                ("paymentAcceptedUrl", payment_accepted_url.to_string()),
                ("paymentRejectedUrl", payment_rejected_url.to_string()),
            ],
        )?;

        self.dispatch(vec![
            RegistrationCommand::AssignRegistrantDetails(details),
            RegistrationCommand::InitiateThirdPartyProcessorPayment(payment),
        ])
        .await?;

        Ok(RegistrationOutcome::PaymentHandoff(PaymentHandoff {
            payment_id,
            redirect_url,
            payment_accepted_url,
            payment_rejected_url,
        }))
    }

    /// Landing page after registration; shows whatever the read model has
    pub async fn thank_you(&self, order_id: Uuid) -> Result<Option<DraftOrder>> {
        Ok(self.orders.find_draft_order(order_id).await?)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Confirmed wins over expired; everything else continues the flow
    fn terminal_outcome(
        &self,
        conference: &ConferenceAlias,
        order: &DraftOrder,
    ) -> Option<RegistrationOutcome> {
        if order.state == DraftOrderState::Confirmed {
            return Some(RegistrationOutcome::CompletedOrder {
                conference_code: conference.code.clone(),
                order_id: order.order_id,
            });
        }

        if order.is_reservation_expired(self.clock.now()) {
            tracing::warn!(
                order_id = %order.order_id,
                expired_at = ?order.reservation_expiration_date,
                "Seat reservation expired"
            );
            return Some(RegistrationOutcome::Expired {
                conference_code: conference.code.clone(),
                order_id: order.order_id,
            });
        }

        None
    }

    async fn wait_until_seats_are_confirmed(
        &self,
        order_id: Uuid,
        last_order_version: i64,
    ) -> Result<Option<DraftOrder>> {
        let profile = &self.settings.reservation_profile;
        let outcome = poll_until(
            profile,
            || self.orders.find_draft_order(order_id),
            |order| {
                order.state != DraftOrderState::PendingReservation
                    && order.is_newer_than(last_order_version)
            },
        )
        .await?;

        self.record_poll(profile, &outcome);
        Ok(outcome.into_option())
    }

    async fn wait_until_order_is_priced(
        &self,
        order_id: Uuid,
        last_order_version: i64,
    ) -> Result<Option<PricedOrder>> {
        let profile = &self.settings.pricing_profile;
        let outcome = poll_until(
            profile,
            || self.orders.find_priced_order(order_id),
            |order| order.order_version > last_order_version,
        )
        .await?;

        self.record_poll(profile, &outcome);
        Ok(outcome.into_option())
    }

    fn record_poll<T>(&self, profile: &PollProfile, outcome: &PollOutcome<T>) {
        self.metrics.record_poll(
            profile.name,
            outcome.attempts(),
            outcome.elapsed().as_secs_f64(),
            outcome.is_found(),
        );
    }

    async fn dispatch(&self, commands: Vec<RegistrationCommand>) -> Result<()> {
        let command_types: Vec<&'static str> = commands.iter().map(|c| c.command_type()).collect();
        let order_id = commands.first().map(|c| c.order_id());

        match self.command_bus.send_batch(commands).await {
            Ok(()) => {
                for command_type in &command_types {
                    self.metrics.record_dispatch(command_type, true);
                }
                tracing::info!(order_id = ?order_id, commands = ?command_types, "Commands dispatched");
                Ok(())
            }
            Err(e) => {
                for command_type in &command_types {
                    self.metrics.record_dispatch(command_type, false);
                }
                tracing::error!(
                    order_id = ?order_id,
                    commands = ?command_types,
                    error = %e,
                    "Command dispatch failed"
                );
                Err(e.into())
            }
        }
    }

    /// Public URL below the base; each segment is percent-encoded on its own
    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.settings.public_base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                anyhow::anyhow!(
                    "Base URL {} cannot carry a path",
                    self.settings.public_base_url
                )
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    fn observe(
        &self,
        operation: &'static str,
        order_id: Option<Uuid>,
        result: Result<RegistrationOutcome>,
    ) -> Result<RegistrationOutcome> {
        match &result {
            Ok(outcome) => {
                self.metrics.record_saga_outcome(operation, outcome.label());
                tracing::info!(
                    operation = operation,
                    order_id = ?order_id,
                    outcome = outcome.label(),
                    "Registration step completed"
                );
            }
            Err(e) => {
                self.metrics.record_saga_outcome(operation, "error");
                tracing::error!(
                    operation = operation,
                    order_id = ?order_id,
                    error = %e,
                    "Registration step failed"
                );
            }
        }
        result
    }
}

fn reservation_unknown(conference: &ConferenceAlias, order_id: Uuid) -> RegistrationOutcome {
    RegistrationOutcome::ReservationUnknown {
        conference_code: conference.code.clone(),
        order_id,
    }
}
