//! # Checkout Session
//!
//! Owns the terminal's cart and drives submission to the invoice owner.
//!
//! ## Submission Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Submission                              │
//! │                                                                     │
//! │  submit():                                                          │
//! │    1. acquire submit lock ── held? ──► SubmissionInFlight           │
//! │    2. freeze cart into a CheckoutRequest (customer + cart checks)   │
//! │    3. await backend exactly once                                    │
//! │         ├── Ok  ──► clear cart, release lock, return receipt        │
//! │         └── Err ──► cart UNTOUCHED, release lock, surface error     │
//! │                                                                     │
//! │  A failed submission keeps the request_id; retrying the same        │
//! │  unchanged cart re-sends it, so the invoice owner can deduplicate.  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{SessionError, SessionResult};
use optica_core::checkout::{build_checkout_request, CheckoutRequest, InitialPayment};
use optica_core::{Cart, InvoiceStatus};

/// The invoice owner as seen from a terminal: the local database in a
/// single-branch deployment, an API client in a networked one.
pub trait InvoiceBackend {
    fn submit_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> impl std::future::Future<Output = SessionResult<CheckoutReceipt>> + Send;
}

/// What the operator sees after a successful submission.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub invoice_id: String,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub status: InvoiceStatus,
}

// =============================================================================
// Submit Lock
// =============================================================================

/// Double-submit guard: at most one submission in flight per terminal.
///
/// Cloneable so UI event handlers can share it; the guard releases on
/// drop, including on panic and early return.
#[derive(Debug, Clone, Default)]
pub struct SubmitLock {
    busy: Arc<AtomicBool>,
}

impl SubmitLock {
    pub fn new() -> Self {
        SubmitLock::default()
    }

    /// Tries to take the lock. `None` while another submission holds it.
    pub fn try_acquire(&self) -> Option<SubmitGuard> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(SubmitGuard {
                busy: Arc::clone(&self.busy),
            })
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// RAII guard for [`SubmitLock`].
#[derive(Debug)]
pub struct SubmitGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Checkout Session
// =============================================================================

/// One terminal's sale in progress: cart, selected customer, and the
/// submission machinery.
#[derive(Debug)]
pub struct CheckoutSession<B> {
    backend: B,
    cart: Cart,
    customer_id: Option<String>,
    branch_id: String,
    lock: SubmitLock,
    /// Request from a failed attempt, kept so an unchanged retry reuses
    /// its request_id and the invoice owner can deduplicate.
    pending: Option<CheckoutRequest>,
}

impl<B: InvoiceBackend> CheckoutSession<B> {
    pub fn new(backend: B, branch_id: impl Into<String>) -> Self {
        CheckoutSession {
            backend,
            cart: Cart::new(),
            customer_id: None,
            branch_id: branch_id.into(),
            lock: SubmitLock::new(),
            pending: None,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn set_customer(&mut self, customer_id: Option<String>) {
        self.customer_id = customer_id;
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn submit_lock(&self) -> &SubmitLock {
        &self.lock
    }

    /// Submits the cart as an invoice-creation request.
    ///
    /// Validation failures (no customer, empty cart, bad deposit) and
    /// backend failures both leave the cart exactly as it was. Only a
    /// confirmed invoice clears it.
    pub async fn submit(&mut self, initial_payment: InitialPayment) -> SessionResult<CheckoutReceipt> {
        let _guard = self
            .lock
            .try_acquire()
            .ok_or(SessionError::SubmissionInFlight)?;

        let mut request = build_checkout_request(
            &self.cart,
            self.customer_id.as_deref(),
            &self.branch_id,
            initial_payment,
        )?;

        // Same sale retried after a failure keeps its original token
        if let Some(prev) = &self.pending {
            if same_sale(prev, &request) {
                request.request_id = prev.request_id;
            }
        }

        info!(
            request_id = %request.request_id,
            lines = request.items.len(),
            total = request.total_cents,
            "Submitting checkout"
        );

        match self.backend.submit_checkout(&request).await {
            Ok(receipt) => {
                self.cart.clear();
                self.pending = None;
                info!(invoice_id = %receipt.invoice_id, status = %receipt.status, "Checkout accepted");
                Ok(receipt)
            }
            Err(err) => {
                warn!(request_id = %request.request_id, error = %err, "Checkout failed, cart preserved");
                self.pending = Some(request);
                Err(err)
            }
        }
    }
}

/// Whether two requests describe the same sale (everything but the
/// request_id itself).
fn same_sale(a: &CheckoutRequest, b: &CheckoutRequest) -> bool {
    let strip = |r: &CheckoutRequest| {
        serde_json::to_value(r).map(|mut v| {
            if let Some(obj) = v.as_object_mut() {
                obj.remove("request_id");
            }
            v
        })
    };

    match (strip(a), strip(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optica_core::{PaymentMethod, Product, ProductKind};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct MockBackend {
        requests: Mutex<Vec<CheckoutRequest>>,
        // Fails this many submissions before accepting
        failures: Mutex<u32>,
    }

    impl MockBackend {
        fn failing(n: u32) -> Self {
            MockBackend {
                requests: Mutex::new(Vec::new()),
                failures: Mutex::new(n),
            }
        }

        fn request_ids(&self) -> Vec<Uuid> {
            self.requests.lock().unwrap().iter().map(|r| r.request_id).collect()
        }
    }

    impl InvoiceBackend for MockBackend {
        async fn submit_checkout(&self, request: &CheckoutRequest) -> SessionResult<CheckoutReceipt> {
            self.requests.lock().unwrap().push(request.clone());

            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(SessionError::Network("timed out".to_string()));
            }

            Ok(CheckoutReceipt {
                invoice_id: "inv-1".to_string(),
                total_cents: request.total_cents,
                amount_paid_cents: request.initial_payment.amount_cents,
                status: InvoiceStatus::Pending,
            })
        }
    }

    fn frame(price_cents: i64) -> Product {
        Product {
            id: "f1".to_string(),
            kind: ProductKind::Frame,
            name: "Clubmaster".to_string(),
            price_cents,
            stock: Some(2),
            details: None,
        }
    }

    #[tokio::test]
    async fn test_successful_submit_clears_cart() {
        let mut session = CheckoutSession::new(MockBackend::default(), "branch-1");
        session.set_customer(Some("cust-1".to_string()));
        session.cart_mut().add_item(&frame(25000)).unwrap();

        let receipt = session.submit(InitialPayment::none()).await.unwrap();
        assert_eq!(receipt.total_cents, 25000);
        assert!(session.cart().is_empty());
        assert!(!session.submit_lock().is_busy());
    }

    #[tokio::test]
    async fn test_failed_submit_preserves_cart() {
        let mut session = CheckoutSession::new(MockBackend::failing(1), "branch-1");
        session.set_customer(Some("cust-1".to_string()));
        session.cart_mut().add_item(&frame(25000)).unwrap();

        let err = session.submit(InitialPayment::none()).await.unwrap_err();
        assert!(matches!(err, SessionError::Network(_)));

        // Cart intact for retry, lock released
        assert_eq!(session.cart().subtotal_cents(), 25000);
        assert!(!session.submit_lock().is_busy());
    }

    #[tokio::test]
    async fn test_retry_of_unchanged_cart_reuses_request_id() {
        let mut session = CheckoutSession::new(MockBackend::failing(1), "branch-1");
        session.set_customer(Some("cust-1".to_string()));
        session.cart_mut().add_item(&frame(25000)).unwrap();

        session.submit(InitialPayment::none()).await.unwrap_err();
        session.submit(InitialPayment::none()).await.unwrap();

        let ids = session.backend.request_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1], "retry must carry the same idempotency token");
    }

    #[tokio::test]
    async fn test_changed_cart_gets_fresh_request_id() {
        let mut session = CheckoutSession::new(MockBackend::failing(1), "branch-1");
        session.set_customer(Some("cust-1".to_string()));
        session.cart_mut().add_item(&frame(25000)).unwrap();

        session.submit(InitialPayment::none()).await.unwrap_err();

        // Operator edits the sale before retrying: different sale now
        session.cart_mut().add_item(&frame(25000)).unwrap();
        session.submit(InitialPayment::none()).await.unwrap();

        let ids = session.backend.request_ids();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn test_validation_failure_never_reaches_backend() {
        let mut session = CheckoutSession::new(MockBackend::default(), "branch-1");
        session.cart_mut().add_item(&frame(25000)).unwrap();

        // No customer selected
        let err = session.submit(InitialPayment::none()).await.unwrap_err();
        assert!(matches!(err, SessionError::Core(_)));
        assert!(session.backend.request_ids().is_empty());
        assert_eq!(session.cart().subtotal_cents(), 25000);

        // Empty cart
        session.set_customer(Some("cust-1".to_string()));
        session.cart_mut().clear();
        let err = session.submit(InitialPayment::none()).await.unwrap_err();
        assert!(matches!(err, SessionError::Core(_)));
        assert!(session.backend.request_ids().is_empty());
    }

    #[tokio::test]
    async fn test_deposit_flows_through_to_receipt() {
        let mut session = CheckoutSession::new(MockBackend::default(), "branch-1");
        session.set_customer(Some("cust-1".to_string()));
        session.cart_mut().add_item(&frame(25000)).unwrap();

        let receipt = session
            .submit(InitialPayment {
                amount_cents: 10000,
                method: PaymentMethod::Cash,
            })
            .await
            .unwrap();
        assert_eq!(receipt.amount_paid_cents, 10000);
    }

    #[test]
    fn test_submit_lock_single_holder() {
        let lock = SubmitLock::new();

        let guard = lock.try_acquire().expect("first acquire succeeds");
        assert!(lock.is_busy());
        assert!(lock.try_acquire().is_none(), "second click must be rejected");

        drop(guard);
        assert!(!lock.is_busy());
        assert!(lock.try_acquire().is_some());
    }
}
