//! HTTP layer.
//!
//! - **Media** (`/images/{filename}`, `/random-image`): read-only access to the image store
//! - **Health** (`/health`): liveness probe
//! - **Webhook** (`/bot<token>`): update delivery from the messaging platform
//!
//! No endpoint requires authentication. The webhook route is only as secret as the bot token in
//! its path.

pub mod handlers;
