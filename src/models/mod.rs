pub mod event;
pub mod id;
pub mod notification;
pub mod resource;
pub mod user;

pub use event::{
    CreateEventRequest, Event, EventCategory, EventPatch, NewEvent, ReminderRequest,
    UpcomingQuery, UpdateEventRequest,
};
pub use id::{Id, InvalidId};
pub use notification::{
    CreateNotificationRequest, NewNotification, Notification, NotificationQuery, SendNowRequest,
    SendNowResponse, SortOrder,
};
pub use resource::{NewResource, Resource};
pub use user::{LoginRequest, PublicUser, SignupRequest, User, UserResponse};

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
