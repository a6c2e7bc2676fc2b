use super::value_objects::{INVOICE_PAYMENT, THIRD_PARTY_PROCESSOR_PAYMENT};

/// How a priced order gets settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentBranch {
    /// Free order: confirm right away
    NoPayment,
    /// Redirect to the external card processor
    ThirdPartyProcessor,
    /// Recognized, but there is no invoice workflow
    Invoice,
    /// Token the registration flow does not know
    Unsupported,
}

/// Pick the settlement path. A free order never needs payment, whatever
/// token the form posted.
pub fn resolve_payment_branch(is_free_of_charge: bool, payment_type: &str) -> PaymentBranch {
    if is_free_of_charge {
        return PaymentBranch::NoPayment;
    }

    match payment_type {
        THIRD_PARTY_PROCESSOR_PAYMENT => PaymentBranch::ThirdPartyProcessor,
        INVOICE_PAYMENT => PaymentBranch::Invoice,
        _ => PaymentBranch::Unsupported,
    }
}
