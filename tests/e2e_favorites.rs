//! E2E tests for the favorites list

mod common;

use autolote::error::AppError;
use autolote::service::FavoriteOutcome;
use common::{ListingSeed, TestServer};

async fn marketplace() -> (TestServer, i64, i64) {
    let server = TestServer::new().await;
    server.seed_catalog();
    let seller = server.seed_user("Vendedor");
    let buyer = server.seed_user("Comprador");
    server.login_as(buyer);
    (server, seller, buyer)
}

#[tokio::test]
async fn test_favorites_require_login() {
    let server = TestServer::new().await;
    assert!(matches!(
        server.market.favorites_manager(),
        Err(AppError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_list_keeps_insertion_order_and_builds_cards() {
    let (server, seller, buyer) = marketplace().await;
    let first = server.seed_listing(ListingSeed {
        owner: seller,
        brand: 2,
        model: 2,
        year: 2,
        price: 12_500_000,
        ..ListingSeed::default()
    });
    let second = server.seed_listing(ListingSeed {
        owner: seller,
        ..ListingSeed::default()
    });
    server.seed_favorite(buyer, second);
    server.seed_favorite(buyer, first);

    let mut manager = server.market.favorites_manager().unwrap();
    let items = manager.load().await.unwrap();

    let ids: Vec<i64> = items.iter().map(|car| car.id_cars).collect();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(items[1].title, "Honda Civic 2019");
    assert_eq!(items[1].price_label, "₡12\u{a0}500\u{a0}000");
    assert!(items[1].image.as_deref().unwrap().starts_with("data:image/png"));
}

#[tokio::test]
async fn test_adding_twice_is_benign() {
    let (server, seller, buyer) = marketplace().await;
    let id = server.seed_listing(ListingSeed {
        owner: seller,
        ..ListingSeed::default()
    });
    let listing = server.market.listings().find_by_id(id).await.unwrap().unwrap();
    let mut manager = server.market.favorites_manager().unwrap();

    assert_eq!(manager.add(&listing).await.unwrap(), FavoriteOutcome::Added);
    assert_eq!(
        manager.add(&listing).await.unwrap(),
        FavoriteOutcome::AlreadyFavorite
    );

    assert_eq!(manager.items().len(), 1);
    let rows = server.rows("wishlist");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id_users"], buyer);
}

#[tokio::test]
async fn test_own_listing_cannot_be_favorited() {
    let (server, _, buyer) = marketplace().await;
    let own = server.seed_listing(ListingSeed {
        owner: buyer,
        ..ListingSeed::default()
    });

    let error = server.market.favorites().add(buyer, own).await.unwrap_err();
    assert_eq!(
        error.user_message("favorite_add"),
        "No puedes agregar tu propio vehículo a favoritos"
    );
    assert_eq!(server.count("wishlist"), 0);
}

#[tokio::test]
async fn test_unknown_listing_is_not_found() {
    let (server, _, buyer) = marketplace().await;
    let error = server.market.favorites().add(buyer, 77).await.unwrap_err();
    assert!(matches!(error, AppError::NotFound));
}

#[tokio::test]
async fn test_remove_updates_local_list_without_refetch() {
    let (server, seller, buyer) = marketplace().await;
    let keep = server.seed_listing(ListingSeed {
        owner: seller,
        ..ListingSeed::default()
    });
    let drop = server.seed_listing(ListingSeed {
        owner: seller,
        ..ListingSeed::default()
    });
    server.seed_favorite(buyer, keep);
    server.seed_favorite(buyer, drop);

    let mut manager = server.market.favorites_manager().unwrap();
    manager.load().await.unwrap();
    server.clear_requests();

    manager.remove(drop).await.unwrap();

    assert_eq!(manager.items().len(), 1);
    assert_eq!(manager.items()[0].id_cars, keep);
    assert_eq!(server.requests().len(), 1);
    assert_eq!(server.count("wishlist"), 1);
}

#[tokio::test]
async fn test_favorites_paginate_by_ten() {
    let (server, seller, buyer) = marketplace().await;
    for _ in 0..12 {
        let id = server.seed_listing(ListingSeed {
            owner: seller,
            images: 0,
            ..ListingSeed::default()
        });
        server.seed_favorite(buyer, id);
    }

    let mut manager = server.market.favorites_manager().unwrap();
    manager.load().await.unwrap();

    let (first, pages) = manager.page(1);
    assert_eq!((first.len(), pages), (10, 2));
    let (second, _) = manager.page(2);
    assert_eq!(second.len(), 2);
    assert!(second[0].image.is_none());
}
