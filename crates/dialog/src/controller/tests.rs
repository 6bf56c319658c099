use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use database::{PgPool, User};
use salon_core::{MaterialUnit, Place, Role, UserStatus};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::sender::{RecordingSender, Sent};
use crate::state::{CartLine, ConsDraft};
use crate::store::MemoryDialogStore;

const ADMIN_CHAT: i64 = 1;
const CHAT: i64 = 42;

fn settings() -> DialogSettings {
    DialogSettings {
        admin_chat_id: ADMIN_CHAT,
        offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        payment_base_url: "https://pay.example.com/".into(),
    }
}

/// A controller whose pool never connects. Only paths that do not touch
/// the database may be exercised.
fn controller(store: Arc<MemoryDialogStore>) -> Controller<RecordingSender> {
    let pool = PgPool::connect_lazy("postgres://salon@localhost/unused").unwrap();
    Controller::new(pool, store, RecordingSender::new(), settings())
}

fn user(role: Role, status: UserStatus) -> User {
    User {
        id: 7,
        chat_id: CHAT,
        name: "Anna Petrova".into(),
        role,
        status,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn cart_dialog() -> Dialog {
    Dialog::new(
        Step::SupCart {
            warehouse_id: 1,
            cart: vec![CartLine {
                material_id: 3,
                name: "Wax".into(),
                unit: MaterialUnit::Gram,
                qty: 5.0,
                unit_cost: 100.0,
            }],
        },
        Some(7),
    )
}

#[tokio::test]
async fn test_cancel_button_drops_cart() {
    let store = Arc::new(MemoryDialogStore::new());
    store.save(CHAT, &cart_dialog()).await.unwrap();
    let controller = controller(store.clone());

    let mut event = ChatEvent::button(CHAT, "cb-1", "nav:cancel");
    if let EventKind::Button { message_id, .. } = &mut event.kind {
        *message_id = Some(7);
    }
    controller
        .handle(event, &CancellationToken::new())
        .await
        .unwrap();

    assert!(store.is_empty().await);
    let sent = controller.sender().sent().await;
    assert_eq!(
        sent[0],
        Sent::Answered {
            callback_id: "cb-1".into()
        }
    );
    assert!(sent.contains(&Sent::Cleared {
        chat_id: CHAT,
        message_id: 7
    }));
    assert_eq!(controller.sender().texts_for(CHAT).await, vec!["Cancelled."]);
}

#[tokio::test]
async fn test_cancel_command_from_idle() {
    let store = Arc::new(MemoryDialogStore::new());
    let controller = controller(store.clone());

    controller
        .handle(ChatEvent::text(CHAT, "/cancel@salon_bot"), &CancellationToken::new())
        .await
        .unwrap();

    assert!(store.is_empty().await);
    let sent = controller.sender().sent().await;
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], Sent::Keyboard { text, .. } if text == "Cancelled."));
}

#[tokio::test]
async fn test_cancelled_event_writes_nothing() {
    let store = Arc::new(MemoryDialogStore::new());
    store.save(CHAT, &cart_dialog()).await.unwrap();
    let controller = controller(store.clone());

    let token = CancellationToken::new();
    token.cancel();
    controller
        .handle(ChatEvent::button(CHAT, "cb-2", "nav:cancel"), &token)
        .await
        .unwrap();

    assert_eq!(store.load(CHAT).await.unwrap(), Some(cart_dialog()));
    assert!(controller.sender().sent().await.is_empty());
}

#[test]
fn test_access_follows_role_and_status() {
    assert_eq!(access_of(&user(Role::Master, UserStatus::Pending)), None);
    assert_eq!(access_of(&user(Role::SalonAdmin, UserStatus::Rejected)), None);
    assert_eq!(
        access_of(&user(Role::Master, UserStatus::Approved)),
        Some(Access::Staff)
    );
    assert_eq!(
        access_of(&user(Role::SalonAdmin, UserStatus::Approved)),
        Some(Access::Admin)
    );
    assert_eq!(
        access_of(&user(Role::SuperAdmin, UserStatus::Approved)),
        Some(Access::SuperAdmin)
    );
}

#[test]
fn test_areas_gate_privileged_steps() {
    assert_eq!(Area::of(&cart_dialog().step), Area::Supply);
    assert_eq!(Area::Supply.access(), Some(Access::Admin));

    let rates = Step::RatesList {
        place: Place::Hall,
        with_sub: true,
    };
    assert_eq!(Area::of(&rates).access(), Some(Access::SuperAdmin));

    let cart = Step::ConsCart {
        draft: ConsDraft::new(Place::Cabinet, 2),
    };
    assert_eq!(Area::of(&cart).access(), Some(Access::Staff));
    assert_eq!(Area::of(&Step::AwaitFio).access(), None);
    assert_eq!(Area::of(&Step::SubBuyPlace), Area::Purchase);
}

#[tokio::test]
async fn test_main_menu_by_role() {
    let controller = controller(Arc::new(MemoryDialogStore::new()));

    let master = controller.main_menu(&user(Role::Master, UserStatus::Approved));
    let tags: Vec<&str> = master
        .keyboard
        .as_ref()
        .map(|k| k.callbacks().collect())
        .unwrap_or_default();
    assert_eq!(tags, ["menu:cons", "menu:buy", "menu:mysubs", "menu:search"]);

    let boss = controller.main_menu(&user(Role::SuperAdmin, UserStatus::Approved));
    assert_eq!(
        boss.keyboard.map(|k| k.callbacks().count()),
        Some(MenuEntry::ALL.len())
    );

    let pending = controller.main_menu(&user(Role::Master, UserStatus::Pending));
    assert!(pending.keyboard.is_none());
    assert!(pending.text.contains("/start"));
}

#[tokio::test]
async fn test_payment_link() {
    let controller = controller(Arc::new(MemoryDialogStore::new()));
    assert_eq!(
        controller.payment_link(15),
        "https://pay.example.com/payments/pay?invoice=15"
    );
}

#[test]
fn test_cancel_detection() {
    assert!(is_cancel(&ChatEvent::text(CHAT, " /cancel ")));
    assert!(is_cancel(&ChatEvent::button(CHAT, "x", "nav:cancel")));
    assert!(!is_cancel(&ChatEvent::button(CHAT, "x", "nav:back")));
    assert!(!is_cancel(&ChatEvent::text(CHAT, "/cancellation")));
}

#[tokio::test]
async fn test_redelivered_button_gives_same_state() {
    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let store = Arc::new(MemoryDialogStore::new());
        store.save(CHAT, &cart_dialog()).await.unwrap();
        let controller = controller(store.clone());

        controller
            .handle(
                ChatEvent::button(CHAT, "cb-3", "nav:cancel"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        outcomes.push((
            store.load(CHAT).await.unwrap(),
            controller.sender().texts_for(CHAT).await,
        ));
    }
    assert_eq!(outcomes[0], outcomes[1]);

    // A second delivery after the reset stays idle.
    let store = Arc::new(MemoryDialogStore::new());
    let controller = controller(store.clone());
    for _ in 0..2 {
        controller
            .handle(
                ChatEvent::button(CHAT, "cb-4", "nav:cancel"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(store.is_empty().await);
    }
}

fn choice_tags(screen: &Screen) -> Vec<String> {
    screen
        .keyboard
        .as_ref()
        .map(|k| {
            k.callbacks()
                .filter(|tag| !tag.starts_with("nav:"))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_choice_screens_list_every_variant() {
    let controller = controller(Arc::new(MemoryDialogStore::new()));

    let places = controller
        .consumption_screen(&Step::ConsPlace)
        .await
        .unwrap();
    assert_eq!(choice_tags(&places), ["cons:place:hall", "cons:place:cabinet"]);

    let buy = controller
        .subscription_screen(&Step::SubBuyPlace)
        .await
        .unwrap();
    assert_eq!(choice_tags(&buy), ["buy:pu:hall", "buy:pu:cabinet"]);

    let rates = controller
        .pricing_screen(&Step::RatesPickPu)
        .await
        .unwrap();
    assert_eq!(choice_tags(&rates), ["rates:pu:hall", "rates:pu:cabinet"]);

    let kinds = controller
        .catalog_screen(&Step::WhType {
            name: "Main".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        choice_tags(&kinds),
        ["adm:wh:type:consumables", "adm:wh:type:client_service"]
    );
}
