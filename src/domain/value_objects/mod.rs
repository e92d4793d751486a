pub mod billing_window;
pub mod months;
pub mod subscription_filter;
pub mod subscriptions;
