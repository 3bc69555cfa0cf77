//! Aggregates module
pub mod product;
pub mod user;
pub mod cart;
pub mod discount;
pub mod order;

pub use product::Product;
pub use user::User;
pub use cart::{AppliedDiscount, Cart, CartError, CartLine};
pub use discount::{Discount, DiscountPatch};
pub use order::{Address, Order, OrderDiscount, OrderError, OrderLine, OrderOwner, PaymentStatus, Settlement};
