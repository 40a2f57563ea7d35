//! Cart splitting
//!
//! A buyer checks out one cart that may hold items of several sellers. Each
//! seller fulfils and gets paid for its own part, so the cart is split into one
//! [`NewTransaction`] per seller before anything is persisted.

use crate::types::{BillingAddress, Buyer, CartItem, NewTransaction, PaymentInfo, SellerId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// A submitted checkout: the cart plus the metadata shared by every sub-order
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub cart: Vec<CartItem>,
    pub billing_address: BillingAddress,
    pub buyer: Buyer,
    pub total_price: Decimal,
    pub payment_info: PaymentInfo,
}

/// Group `checkout.cart` by seller
///
/// Produces one request per distinct seller identifier, in the order each
/// seller first appears in the cart. Items keep their relative order inside
/// their group. Seller identifiers are compared as-is: `"A"` and `"a "` are two
/// sellers. Every request inherits the shared billing address, buyer, payment
/// info and the full `total_price`.
///
/// An empty cart yields no requests.
pub fn split_cart(checkout: CheckoutRequest) -> Vec<NewTransaction> {
    let CheckoutRequest {
        cart,
        billing_address,
        buyer,
        total_price,
        payment_info,
    } = checkout;

    let mut groups: Vec<(SellerId, Vec<CartItem>)> = Vec::new();
    let mut index: HashMap<SellerId, usize> = HashMap::new();

    for item in cart {
        match index.get(&item.seller_id) {
            Some(&position) => groups[position].1.push(item),
            None => {
                index.insert(item.seller_id.clone(), groups.len());
                groups.push((item.seller_id.clone(), vec![item]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(seller_id, items)| NewTransaction {
            seller_id,
            cart: items,
            billing_address: billing_address.clone(),
            buyer: buyer.clone(),
            total_price,
            payment_info: payment_info.clone(),
        })
        .collect()
}
