//! Typed repository for persisted orders.
//!
//! Orders carry the checkout phase machine, so every partially completed
//! payment is observable in the store rather than only in client logs.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use lms_models::{CheckoutPhase, CourseId, Order, OrderId, UserId};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{Document, Filter, StructuredQuery, ToStoreValue, Value};

/// Collection holding order documents.
pub const COLLECTION: &str = "orders";

/// Repository for order documents.
#[derive(Clone)]
pub struct OrderRepository {
    client: StoreClient,
}

impl OrderRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Get an order by local id.
    pub async fn get(&self, order_id: &OrderId) -> StoreResult<Option<Order>> {
        let doc = self.client.get_document(COLLECTION, order_id.as_str()).await?;

        match doc {
            Some(d) => Ok(Some(document_to_order(&d)?)),
            None => Ok(None),
        }
    }

    /// Look an order up by the gateway's order id.
    pub async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> StoreResult<Option<Order>> {
        let mut query = StructuredQuery::collection(COLLECTION);
        query.r#where = Some(Filter::field(
            "gateway_order_id",
            "EQUAL",
            Value::StringValue(gateway_order_id.to_string()),
        ));
        query.limit = Some(1);

        let docs = self.client.run_query(None, query).await?;
        match docs.first() {
            Some(doc) => Ok(Some(document_to_order(doc)?)),
            None => Ok(None),
        }
    }

    /// Create a new order document.
    pub async fn create(&self, order: &Order) -> StoreResult<()> {
        let fields = order_to_fields(order);
        self.client
            .create_document(COLLECTION, order.order_id.as_str(), fields)
            .await?;
        info!(
            "Created order {} (gateway {}) for user {} in phase {}",
            order.order_id, order.gateway_order_id, order.user, order.phase
        );
        Ok(())
    }

    /// Persist the order's phase fields after a transition on the model.
    pub async fn save_phase(&self, order: &Order) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("phase".to_string(), order.phase.as_str().to_store_value());
        fields.insert("payment_id".to_string(), order.payment_id.to_store_value());
        fields.insert(
            "failure_reason".to_string(),
            order.failure_reason.to_store_value(),
        );
        fields.insert("updated_at".to_string(), Utc::now().to_store_value());

        self.client
            .update_document(
                COLLECTION,
                order.order_id.as_str(),
                fields,
                Some(vec![
                    "phase".to_string(),
                    "payment_id".to_string(),
                    "failure_reason".to_string(),
                    "updated_at".to_string(),
                ]),
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// Document conversion
// =============================================================================

pub(crate) fn order_to_fields(order: &Order) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("order_id".to_string(), order.order_id.0.to_store_value());
    fields.insert(
        "gateway_order_id".to_string(),
        order.gateway_order_id.to_store_value(),
    );
    fields.insert("user".to_string(), order.user.0.to_store_value());
    let courses: Vec<String> = order.courses.iter().map(|c| c.0.clone()).collect();
    fields.insert("courses".to_string(), courses.to_store_value());
    fields.insert("amount".to_string(), order.amount.to_store_value());
    fields.insert("currency".to_string(), order.currency.to_store_value());
    fields.insert("phase".to_string(), order.phase.as_str().to_store_value());
    fields.insert("payment_id".to_string(), order.payment_id.to_store_value());
    fields.insert(
        "failure_reason".to_string(),
        order.failure_reason.to_store_value(),
    );
    fields.insert("created_at".to_string(), order.created_at.to_store_value());
    fields.insert("updated_at".to_string(), order.updated_at.to_store_value());
    fields
}

pub(crate) fn document_to_order(doc: &Document) -> StoreResult<Order> {
    let order_id = doc
        .field::<String>("order_id")
        .or_else(|| doc.doc_id().map(str::to_string))
        .ok_or_else(|| StoreError::invalid_response("order document missing id"))?;

    let missing = |name: &str| {
        StoreError::invalid_response(format!("order {} missing field {}", order_id, name))
    };

    Ok(Order {
        order_id: OrderId::from(order_id.clone()),
        gateway_order_id: doc
            .field("gateway_order_id")
            .ok_or_else(|| missing("gateway_order_id"))?,
        user: UserId::from(doc.field::<String>("user").ok_or_else(|| missing("user"))?),
        courses: doc
            .array_field::<String>("courses")
            .into_iter()
            .map(CourseId::from)
            .collect(),
        amount: doc.field("amount").ok_or_else(|| missing("amount"))?,
        currency: doc.field("currency").ok_or_else(|| missing("currency"))?,
        phase: doc
            .field::<String>("phase")
            .and_then(|s| CheckoutPhase::from_str(&s))
            .unwrap_or_default(),
        payment_id: doc.field("payment_id"),
        failure_reason: doc.field("failure_reason"),
        created_at: doc.field("created_at").unwrap_or_else(Utc::now),
        updated_at: doc.field("updated_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order::new(
            "order_G42",
            UserId::from("u1"),
            vec![CourseId::from("c1")],
            49900,
            "INR",
        )
    }

    #[test]
    fn order_round_trips_through_fields() {
        let mut order = sample_order();
        order.transition(CheckoutPhase::AwaitingGatewayCallback).unwrap();
        order.payment_id = Some("pay_77".to_string());

        let doc = Document::new(order_to_fields(&order));
        let parsed = document_to_order(&doc).unwrap();

        assert_eq!(parsed.order_id, order.order_id);
        assert_eq!(parsed.gateway_order_id, "order_G42");
        assert_eq!(parsed.phase, CheckoutPhase::AwaitingGatewayCallback);
        assert_eq!(parsed.payment_id.as_deref(), Some("pay_77"));
        assert_eq!(parsed.amount, 49900);
    }

    #[test]
    fn null_payment_id_reads_back_as_none() {
        let order = sample_order();
        let doc = Document::new(order_to_fields(&order));
        let parsed = document_to_order(&doc).unwrap();
        assert_eq!(parsed.payment_id, None);
        assert_eq!(parsed.failure_reason, None);
    }
}
