//! Status and role enums for stored entities.
//!
//! Every enum serializes as its SCREAMING_SNAKE_CASE name, which is also the
//! label of the matching `PostgreSQL` enum type in the `shop` schema.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown status label.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Define a status enum with string conversions and a `PostgreSQL` enum mapping.
macro_rules! define_status {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, $pg_type:tt {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "postgres", derive(sqlx::Type))]
        #[cfg_attr(
            feature = "postgres",
            sqlx(type_name = $pg_type, rename_all = "SCREAMING_SNAKE_CASE")
        )]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical label.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ParseStatusError;

            /// Parse a label, ignoring ASCII case and surrounding whitespace.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ParseStatusError {
                        kind: $kind,
                        value: s.to_owned(),
                    })
            }
        }
    };
}

define_status! {
    /// Account role.
    UserRole, "user role", "shop.user_role" {
        Customer => "CUSTOMER",
        Admin => "ADMIN",
    }
}

define_status! {
    /// Account status. Only active accounts can log in or use tokens.
    UserStatus, "user status", "shop.user_status" {
        Active => "ACTIVE",
        Inactive => "INACTIVE",
        Suspended => "SUSPENDED",
    }
}

define_status! {
    /// Order lifecycle.
    ///
    /// `Pending` orders await payment and have not taken stock yet.
    OrderStatus, "order status", "shop.order_status" {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Shipped => "SHIPPED",
        Delivered => "DELIVERED",
        Cancelled => "CANCELLED",
    }
}

impl OrderStatus {
    /// Whether stock has been decremented for an order in this status.
    #[must_use]
    pub const fn holds_stock(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Shipped | Self::Delivered)
    }

    /// Whether an order in this status proves the customer bought its products.
    #[must_use]
    pub const fn counts_as_purchase(&self) -> bool {
        self.holds_stock()
    }

    /// Whether the order may still be cancelled.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        !matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// What moving an order from this status to `next` involves.
    ///
    /// # Errors
    ///
    /// Returns a message for transitions that would leave stock and status
    /// disagreeing.
    pub const fn change_to(self, next: Self) -> Result<StatusChange, &'static str> {
        match (self, next) {
            (current, Self::Cancelled) => {
                if current.is_cancellable() {
                    Ok(StatusChange::Cancel)
                } else {
                    Err("Delivered or cancelled orders cannot be cancelled")
                }
            }
            (Self::Pending, Self::Confirmed) => Ok(StatusChange::Confirm),
            (Self::Cancelled, _) => Err("Cancelled orders cannot change status"),
            (Self::Pending, _) => Err("Pending orders must be confirmed before they ship"),
            (_, Self::Pending) => Err("Confirmed orders cannot return to PENDING"),
            _ => Ok(StatusChange::Set),
        }
    }
}

/// The stock work behind an order status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Take stock for every line, then mark `CONFIRMED`.
    Confirm,
    /// Return held stock, then mark `CANCELLED`.
    Cancel,
    /// Only the status changes.
    Set,
}

define_status! {
    /// Payment lifecycle.
    PaymentStatus, "payment status", "shop.payment_status" {
        Pending => "PENDING",
        Approved => "APPROVED",
        Canceled => "CANCELED",
        Failed => "FAILED",
        Refunded => "REFUNDED",
    }
}

define_status! {
    /// Payment method reported by the payment provider.
    PaymentMethod, "payment method", "shop.payment_method" {
        Card => "CARD",
        BankTransfer => "BANK_TRANSFER",
        VirtualAccount => "VIRTUAL_ACCOUNT",
        MobilePhone => "MOBILE_PHONE",
        KakaoPay => "KAKAO_PAY",
        NaverPay => "NAVER_PAY",
        TossPay => "TOSS_PAY",
    }
}

impl PaymentMethod {
    /// Map the provider's `method` field (and easy-pay provider name, if any).
    ///
    /// Toss reports either English codes or Korean labels depending on API version.
    /// Unknown values fall back to `Card`.
    #[must_use]
    pub fn from_provider(method: Option<&str>, easy_pay_provider: Option<&str>) -> Self {
        let Some(method) = method.map(str::trim) else {
            return Self::Card;
        };

        match method {
            "CARD" | "카드" => Self::Card,
            "TRANSFER" | "BANK_TRANSFER" | "계좌이체" => Self::BankTransfer,
            "VIRTUAL_ACCOUNT" | "가상계좌" => Self::VirtualAccount,
            "MOBILE_PHONE" | "휴대폰" => Self::MobilePhone,
            "EASY_PAY" | "간편결제" => match easy_pay_provider.map(str::trim) {
                Some("카카오페이" | "KAKAOPAY") => Self::KakaoPay,
                Some("네이버페이" | "NAVERPAY") => Self::NaverPay,
                Some("토스페이" | "TOSSPAY") => Self::TossPay,
                _ => Self::Card,
            },
            other => other.parse().unwrap_or(Self::Card),
        }
    }
}

define_status! {
    /// Review visibility.
    ReviewStatus, "review status", "shop.review_status" {
        Active => "ACTIVE",
        Hidden => "HIDDEN",
    }
}

define_status! {
    /// Reader reaction to a review.
    ReviewActionType, "review action", "shop.review_action_type" {
        Like => "LIKE",
        Report => "REPORT",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("delivered".parse::<OrderStatus>().unwrap(), OrderStatus::Delivered);
        assert_eq!(" Admin ".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(
            "bank_transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = "SHIPPING".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert_eq!(err.to_string(), "invalid order status: SHIPPING");
    }

    #[test]
    fn test_serde_labels() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Canceled).unwrap(),
            "\"CANCELED\""
        );
        assert_eq!(
            serde_json::from_str::<ReviewActionType>("\"REPORT\"").unwrap(),
            ReviewActionType::Report
        );
    }

    #[test]
    fn test_display_matches_label() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[test]
    fn test_order_status_stock_rules() {
        assert!(!OrderStatus::Pending.holds_stock());
        assert!(OrderStatus::Confirmed.holds_stock());
        assert!(OrderStatus::Delivered.holds_stock());
        assert!(!OrderStatus::Cancelled.holds_stock());

        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Shipped.is_cancellable());
        assert!(!OrderStatus::Delivered.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_status_changes() {
        use OrderStatus::{Cancelled, Confirmed, Delivered, Pending, Shipped};

        assert_eq!(Pending.change_to(Confirmed), Ok(StatusChange::Confirm));
        assert_eq!(Shipped.change_to(Cancelled), Ok(StatusChange::Cancel));
        assert_eq!(Pending.change_to(Cancelled), Ok(StatusChange::Cancel));
        assert_eq!(Confirmed.change_to(Shipped), Ok(StatusChange::Set));
        assert_eq!(Shipped.change_to(Delivered), Ok(StatusChange::Set));

        assert!(Delivered.change_to(Cancelled).is_err());
        assert!(Cancelled.change_to(Cancelled).is_err());
        assert!(Cancelled.change_to(Shipped).is_err());
        assert!(Pending.change_to(Shipped).is_err());
        assert!(Confirmed.change_to(Pending).is_err());
    }

    #[test]
    fn test_payment_method_from_provider() {
        assert_eq!(PaymentMethod::from_provider(None, None), PaymentMethod::Card);
        assert_eq!(
            PaymentMethod::from_provider(Some("TRANSFER"), None),
            PaymentMethod::BankTransfer
        );
        assert_eq!(
            PaymentMethod::from_provider(Some("가상계좌"), None),
            PaymentMethod::VirtualAccount
        );
        assert_eq!(
            PaymentMethod::from_provider(Some("간편결제"), Some("카카오페이")),
            PaymentMethod::KakaoPay
        );
        assert_eq!(
            PaymentMethod::from_provider(Some("간편결제"), Some("토스페이")),
            PaymentMethod::TossPay
        );
        assert_eq!(
            PaymentMethod::from_provider(Some("GIFT_CERTIFICATE"), None),
            PaymentMethod::Card
        );
    }
}
