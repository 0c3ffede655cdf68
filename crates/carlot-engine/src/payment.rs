//! # Payment Service
//!
//! Payment intents, signed gateway confirmations and refunds.
//!
//! ## Verification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  verify_payment(order_id, gateway_payment_id, signature)               │
//! │                                                                         │
//! │  check = HMAC(order_id|gateway_payment_id) vs signature                 │
//! │  payment = by order id                                                  │
//! │                                                                         │
//! │  status      check ok                      check failed                 │
//! │  ─────────   ───────────────────────────   ──────────────────────────   │
//! │  pending     CAS → completed               CAS → failed,                │
//! │                                            SignatureVerificationFailed  │
//! │  completed/  same payment id: replay,      SignatureVerificationFailed  │
//! │  refunded    return record unchanged       (no state change)            │
//! │              other id: AlreadySettled                                   │
//! │  failed/     Conflict(WrongStatus)         SignatureVerificationFailed  │
//! │  cancelled                                                              │
//! │                                                                         │
//! │  CAS lost (StaleState) → re-read, decide again from the new status     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A payment never returns to `pending`, so the re-read settles in one more
//! round.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use carlot_core::gateway::build_receipt;
use carlot_core::lifecycle::check_payment_transition;
use carlot_core::validation::{
    validate_notes, validate_payment_amount, validate_reference, validate_refund_amount,
};
use carlot_core::{
    BookingStatus, BookingStore, ConflictReason, CoreError, CoreResult, NewPayment, OrderRequest,
    Payment, PaymentGateway, PaymentMethod, PaymentRequest, PaymentStatus, PaymentStore,
    PaymentUpdate, SignatureCheck, SignatureVerifier, ValidationError,
};

/// Settings injected at construction.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Currency recorded on new payments and sent with gateway orders.
    pub currency: String,
    /// Keyed with the gateway secret.
    pub verifier: SignatureVerifier,
}

/// Creates, verifies and refunds payments.
#[derive(Clone)]
pub struct PaymentService {
    bookings: Arc<dyn BookingStore>,
    payments: Arc<dyn PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
    settings: PaymentSettings,
}

impl PaymentService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        payments: Arc<dyn PaymentStore>,
        gateway: Arc<dyn PaymentGateway>,
        settings: PaymentSettings,
    ) -> Self {
        PaymentService {
            bookings,
            payments,
            gateway,
            settings,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Records a `pending` payment against a booking. Gateway payments also
    /// get a remote order whose id is stored on the row.
    ///
    /// ## Errors
    /// - `Validation`: bad amount, unknown method, amount above booking total
    /// - `NotFound`: booking
    /// - `Conflict`: booking closed, or already paid
    /// - `ExternalService`: gateway failed; the payment is marked `failed`
    pub async fn create_payment(&self, request: PaymentRequest) -> CoreResult<Payment> {
        validate_reference("booking_id", &request.booking_id)?;
        validate_payment_amount(request.amount)?;
        validate_notes("description", request.description.as_deref())?;
        let method: PaymentMethod = request.method.parse()?;

        let booking = self.bookings.get_booking(&request.booking_id).await?;

        if matches!(
            booking.status,
            BookingStatus::Cancelled | BookingStatus::Completed
        ) {
            return Err(CoreError::Conflict(ConflictReason::WrongStatus {
                entity: "booking".to_string(),
                id: booking.id,
                status: booking.status.to_string(),
                action: "accept payments".to_string(),
            }));
        }

        if request.amount > booking.total_amount {
            return Err(ValidationError::Exceeds {
                field: "payment amount".to_string(),
                value: request.amount,
                max: booking.total_amount,
            }
            .into());
        }

        let existing = self.payments.payments_for_booking(&booking.id).await?;
        if existing
            .iter()
            .any(|p| matches!(p.status, PaymentStatus::Completed | PaymentStatus::Refunded))
        {
            return Err(CoreError::Conflict(ConflictReason::DuplicateCompletion {
                booking_id: booking.id,
            }));
        }

        let payment = self
            .payments
            .insert_payment(NewPayment {
                booking_id: booking.id.clone(),
                amount: request.amount,
                currency: self.settings.currency.clone(),
                method,
                description: request.description,
            })
            .await?;

        info!(
            payment_id = %payment.id,
            booking_id = %booking.id,
            amount = payment.amount,
            method = %method,
            "Payment created"
        );

        if !method.uses_gateway() {
            return Ok(payment);
        }

        let order_request = OrderRequest {
            amount: payment.amount,
            currency: payment.currency.clone(),
            receipt: build_receipt(&booking.id, Utc::now()),
        };

        let order = match self.gateway.create_order(&order_request).await {
            Ok(order) => order,
            Err(e) => {
                warn!(payment_id = %payment.id, error = %e, "Gateway order failed");
                if let Err(mark) = self
                    .payments
                    .transition_payment(
                        &payment.id,
                        PaymentStatus::Pending,
                        PaymentStatus::Failed,
                        PaymentUpdate::default(),
                    )
                    .await
                {
                    warn!(payment_id = %payment.id, error = %mark, "Could not mark payment failed");
                }
                return Err(e.into());
            }
        };

        if order.amount != payment.amount {
            warn!(
                payment_id = %payment.id,
                order_id = %order.id,
                expected = payment.amount,
                returned = order.amount,
                "Gateway order amount differs from payment"
            );
        }

        let payment = self.payments.attach_order(&payment.id, &order.id).await?;

        info!(payment_id = %payment.id, order_id = %order.id, "Gateway order attached");
        Ok(payment)
    }

    // =========================================================================
    // Verify
    // =========================================================================

    /// Applies a signed gateway confirmation exactly once.
    ///
    /// Replaying a confirmation that already completed the payment returns
    /// the stored record unchanged.
    pub async fn verify_payment(
        &self,
        order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> CoreResult<Payment> {
        validate_reference("order_id", order_id)?;
        validate_reference("gateway_payment_id", gateway_payment_id)?;
        if signature.trim().is_empty() {
            return Err(ValidationError::required("signature").into());
        }

        let check = self
            .settings
            .verifier
            .verify(order_id, gateway_payment_id, signature);

        let mut payment = self.payments.payment_by_order_id(order_id).await?;

        loop {
            match payment.status {
                PaymentStatus::Pending => {
                    let outcome = if check.is_accepted() {
                        self.complete(&payment, gateway_payment_id, check).await
                    } else {
                        self.fail(&payment, gateway_payment_id).await
                    };

                    match outcome {
                        Err(CoreError::Conflict(ConflictReason::StaleState { .. })) => {
                            debug!(order_id = %order_id, "Lost verification race, re-reading");
                            payment = self.payments.get_payment(&payment.id).await?;
                        }
                        other => return other,
                    }
                }

                _ if !check.is_accepted() => {
                    warn!(
                        order_id = %order_id,
                        status = %payment.status,
                        "Invalid signature for settled payment"
                    );
                    return Err(CoreError::SignatureVerificationFailed {
                        order_id: order_id.to_string(),
                    });
                }

                PaymentStatus::Completed | PaymentStatus::Refunded => {
                    return match payment.gateway_payment_id.as_deref() {
                        Some(existing) if existing == gateway_payment_id => {
                            info!(
                                payment_id = %payment.id,
                                order_id = %order_id,
                                "Confirmation replayed, returning settled payment"
                            );
                            Ok(payment)
                        }
                        existing => {
                            warn!(
                                payment_id = %payment.id,
                                order_id = %order_id,
                                gateway_payment_id = %gateway_payment_id,
                                "Confirmation for a payment settled by another gateway payment"
                            );
                            Err(CoreError::Conflict(ConflictReason::AlreadySettled {
                                payment_id: payment.id,
                                existing_gateway_payment_id: existing
                                    .unwrap_or_default()
                                    .to_string(),
                            }))
                        }
                    };
                }

                PaymentStatus::Failed | PaymentStatus::Cancelled => {
                    return Err(CoreError::Conflict(ConflictReason::WrongStatus {
                        entity: "payment".to_string(),
                        id: payment.id,
                        status: payment.status.to_string(),
                        action: "verify".to_string(),
                    }));
                }
            }
        }
    }

    async fn complete(
        &self,
        payment: &Payment,
        gateway_payment_id: &str,
        check: SignatureCheck,
    ) -> CoreResult<Payment> {
        let completed = self
            .payments
            .transition_payment(
                &payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Completed,
                PaymentUpdate {
                    gateway_payment_id: Some(gateway_payment_id.to_string()),
                    transaction_id: Some(gateway_payment_id.to_string()),
                    ..PaymentUpdate::default()
                },
            )
            .await?;

        if check == SignatureCheck::TestBypass {
            warn!(payment_id = %payment.id, "Payment completed with a test signature");
        }

        info!(
            payment_id = %completed.id,
            booking_id = %completed.booking_id,
            gateway_payment_id = %gateway_payment_id,
            "Payment verified"
        );

        Ok(completed)
    }

    async fn fail(&self, payment: &Payment, gateway_payment_id: &str) -> CoreResult<Payment> {
        self.payments
            .transition_payment(
                &payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Failed,
                PaymentUpdate {
                    gateway_payment_id: Some(gateway_payment_id.to_string()),
                    ..PaymentUpdate::default()
                },
            )
            .await?;

        warn!(
            payment_id = %payment.id,
            gateway_payment_id = %gateway_payment_id,
            "Signature mismatch, payment marked failed"
        );

        Err(CoreError::SignatureVerificationFailed {
            order_id: payment.gateway_order_id.clone().unwrap_or_default(),
        })
    }

    // =========================================================================
    // Refund / Admin
    // =========================================================================

    /// Refunds up to the original amount of a `completed` payment.
    ///
    /// Gateway and transaction ids are carried forward. The booking is left
    /// as it is.
    pub async fn process_refund(&self, payment_id: &str, amount: i64) -> CoreResult<Payment> {
        let payment = self.payments.get_payment(payment_id).await?;

        validate_refund_amount(amount, payment.amount)?;
        check_payment_transition(payment.status, PaymentStatus::Refunded)?;

        let refunded = self
            .payments
            .transition_payment(
                payment_id,
                PaymentStatus::Completed,
                PaymentStatus::Refunded,
                PaymentUpdate {
                    refunded_amount: Some(amount),
                    ..PaymentUpdate::default()
                },
            )
            .await?;

        info!(
            payment_id = %payment_id,
            amount,
            original = payment.amount,
            "Payment refunded"
        );

        Ok(refunded)
    }

    /// Moves a payment to `status` (one of the five payment status strings)
    /// without a gateway signature.
    ///
    /// Gateway payments only settle through [`verify_payment`](Self::verify_payment):
    /// moving one to `completed` or `failed` here is a `WrongStatus` conflict.
    /// Cancelling a pending gateway payment and refunding a verified one are
    /// allowed. `refunded` through this path records the full amount as
    /// refunded.
    pub async fn update_payment_status(&self, payment_id: &str, status: &str) -> CoreResult<Payment> {
        let next: PaymentStatus = status.parse()?;
        let payment = self.payments.get_payment(payment_id).await?;

        check_payment_transition(payment.status, next)?;

        if payment.method.uses_gateway()
            && matches!(next, PaymentStatus::Completed | PaymentStatus::Failed)
        {
            warn!(
                payment_id = %payment_id,
                to = %next,
                "Refusing to settle a gateway payment without a signed confirmation"
            );
            return Err(CoreError::Conflict(ConflictReason::WrongStatus {
                entity: "payment".to_string(),
                id: payment.id,
                status: payment.status.to_string(),
                action: "settle without signature".to_string(),
            }));
        }

        let update = match next {
            PaymentStatus::Refunded => PaymentUpdate {
                refunded_amount: Some(payment.amount),
                ..PaymentUpdate::default()
            },
            _ => PaymentUpdate::default(),
        };

        let updated = self
            .payments
            .transition_payment(payment_id, payment.status, next, update)
            .await?;

        info!(
            payment_id = %payment_id,
            from = %payment.status,
            to = %next,
            "Payment status updated"
        );

        Ok(updated)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_payment(&self, payment_id: &str) -> CoreResult<Payment> {
        Ok(self.payments.get_payment(payment_id).await?)
    }

    pub async fn payments_for_booking(&self, booking_id: &str) -> CoreResult<Vec<Payment>> {
        Ok(self.payments.payments_for_booking(booking_id).await?)
    }

    pub async fn list_payments(&self) -> CoreResult<Vec<Payment>> {
        Ok(self.payments.list_payments().await?)
    }
}
