use std::sync::mpsc::Sender;
use std::thread;

use log::error;

use crate::api::ApiClient;

use super::messages::AppMessage;

pub fn load_roots(client: ApiClient, tx: Sender<AppMessage>, post_id: String, limit: usize) {
    thread::spawn(move || {
        let result = client.all_comments(&post_id, None, limit);
        if tx.send(AppMessage::RootsLoaded { post_id, result }).is_err() {
            error!("failed to send RootsLoaded message");
        }
    });
}

pub fn load_focus(client: ApiClient, tx: Sender<AppMessage>, comment_id: String) {
    thread::spawn(move || {
        let result = client
            .get_comment(&comment_id, false)
            .map(|details| details.comment);
        if tx
            .send(AppMessage::FocusLoaded { comment_id, result })
            .is_err()
        {
            error!("failed to send FocusLoaded message");
        }
    });
}

pub fn load_replies(client: ApiClient, tx: Sender<AppMessage>, comment_id: String, limit: usize) {
    thread::spawn(move || {
        let result = client.all_direct_replies(&comment_id, limit);
        if tx
            .send(AppMessage::RepliesLoaded { comment_id, result })
            .is_err()
        {
            error!("failed to send RepliesLoaded message");
        }
    });
}
