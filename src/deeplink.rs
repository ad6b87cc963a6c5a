//! Deeplink routing from notification payloads to screens.

use crate::collaborators::UiPresenter;
use crate::error::{RealtimeError, Result};
use crate::records::DomainRecord;
use crate::types::{ConversationId, OrderId, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Structured navigation payload carried by notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeeplinkPayload {
    pub route: String,
    #[serde(default, alias = "order_id", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, alias = "seller_id", skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<UserId>,
}

impl DeeplinkPayload {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            order_id: None,
            seller_id: None,
        }
    }

    pub fn with_order(mut self, order_id: impl Into<OrderId>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_seller(mut self, seller_id: impl Into<UserId>) -> Self {
        self.seller_id = Some(seller_id.into());
        self
    }
}

/// A screen transition the UI collaborator performs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum NavigationAction {
    OrderDetail { order_id: OrderId },
    SellerProfile { seller_id: UserId },
    OrderReview { order_id: OrderId, seller_id: UserId },
    Conversation { conversation_id: ConversationId },
    NotificationList,
}

/// Route names understood by the router.
const ROUTE_ORDER_DETAIL: &str = "order_detail";
const ROUTE_SELLER_PROFILE: &str = "seller_profile";
const ROUTE_ORDER_REVIEW: &str = "order_review";
const ROUTE_NOTIFICATIONS: &str = "notifications";

/// Maps deeplink payloads to navigation actions.
#[derive(Clone, Debug, Default)]
pub struct DeeplinkRouter;

impl DeeplinkRouter {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a payload to the screen it names.
    pub fn resolve(&self, payload: &DeeplinkPayload) -> Result<NavigationAction> {
        let route = normalize_route(&payload.route);

        let action = match route.as_str() {
            ROUTE_ORDER_DETAIL => NavigationAction::OrderDetail {
                order_id: require(&payload.order_id, &payload.route, "orderId")?,
            },
            ROUTE_SELLER_PROFILE => NavigationAction::SellerProfile {
                seller_id: require(&payload.seller_id, &payload.route, "sellerId")?,
            },
            ROUTE_ORDER_REVIEW => NavigationAction::OrderReview {
                order_id: require(&payload.order_id, &payload.route, "orderId")?,
                seller_id: require(&payload.seller_id, &payload.route, "sellerId")?,
            },
            ROUTE_NOTIFICATIONS => NavigationAction::NotificationList,
            _ => return Err(RealtimeError::UnknownRoute(payload.route.clone())),
        };

        Ok(action)
    }

    /// The screen a tap on this record leads to.
    pub fn for_record(&self, record: &DomainRecord) -> Result<NavigationAction> {
        match record {
            DomainRecord::Message(m) => Ok(NavigationAction::Conversation {
                conversation_id: m.conversation_id.clone(),
            }),
            DomainRecord::OrderStatusChange(o) => Ok(NavigationAction::OrderDetail {
                order_id: o.order_id.clone(),
            }),
            DomainRecord::Notification(n) => match &n.deeplink {
                Some(payload) => self.resolve(payload),
                None => Ok(NavigationAction::NotificationList),
            },
        }
    }

    /// Resolve and hand the result to the presenter.
    ///
    /// Unresolvable payloads are logged and leave the screen as it is.
    pub fn route(
        &self,
        payload: &DeeplinkPayload,
        presenter: &dyn UiPresenter,
    ) -> Option<NavigationAction> {
        match self.resolve(payload) {
            Ok(action) => {
                debug!(route = %payload.route, ?action, "navigating from deeplink");
                presenter.navigate(&action);
                Some(action)
            }
            Err(e) => {
                warn!(route = %payload.route, error = %e, "ignoring deeplink");
                None
            }
        }
    }
}

fn require<T: Clone>(value: &Option<T>, route: &str, parameter: &'static str) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| RealtimeError::MissingRouteParameter {
            route: route.to_string(),
            parameter,
        })
}

/// Fold `orderDetail`, `order-detail` and `/order_detail` into one spelling.
fn normalize_route(route: &str) -> String {
    let trimmed = route.trim().trim_start_matches('/');
    let mut out = String::with_capacity(trimmed.len() + 4);
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}
