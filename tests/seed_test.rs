//! Integration tests for the seeding client against a mock content API.

#![cfg(feature = "remote")]

use deep_populate::seed::{self, CollectionSeed, SeedClient, SeedConfig, SeedManifest, SingleSeed};
use deep_populate::SeedError;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

fn client(server: &ServerGuard) -> SeedClient {
    SeedClient::new(SeedConfig::new(server.url())).unwrap()
}

fn lookup(field: &str, value: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded(format!("filters[{}][$eq]", field), value.into()),
        Matcher::UrlEncoded("pagination[pageSize]".into(), "1".into()),
        Matcher::UrlEncoded("publicationState".into(), "preview".into()),
    ])
}

fn listing() -> Matcher {
    Matcher::UrlEncoded("pagination[pageSize]".into(), "1000".into())
}

mod upsert {
    use super::*;

    #[test]
    fn updates_existing_record() {
        let mut server = Server::new();
        let found = server
            .mock("GET", "/api/techs")
            .match_query(lookup("slug", "nextjs"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"id":7,"slug":"nextjs","name":"Next","createdAt":"2024-01-01"}]}"#)
            .create();
        let updated = server
            .mock("PUT", "/api/techs/7")
            .match_body(Matcher::PartialJson(
                json!({ "data": { "slug": "nextjs", "name": "Next.js" } }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"id":7,"slug":"nextjs"}}"#)
            .create();

        let id = client(&server)
            .upsert_by_slug("techs", "nextjs", &json!({ "slug": "nextjs", "name": "Next.js" }), None)
            .unwrap();

        assert_eq!(id, Some(7));
        found.assert();
        updated.assert();
    }

    #[test]
    fn creates_missing_record() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/techs")
            .match_query(lookup("slug", "react"))
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create();
        server
            .mock("GET", "/api/techs")
            .match_query(listing())
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create();
        let created = server
            .mock("POST", "/api/techs")
            .match_body(Matcher::PartialJson(json!({ "data": { "slug": "react" } })))
            .with_status(200)
            .with_body(r#"{"data":{"id":12,"slug":"react"}}"#)
            .create();

        let id = client(&server)
            .upsert_by_slug("techs", "react", &json!({ "slug": "react", "id": 99 }), None)
            .unwrap();

        assert_eq!(id, Some(12));
        created.assert();
    }

    #[test]
    fn falls_back_to_listing_when_filter_fails() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/contributors")
            .match_query(lookup("username", "jake"))
            .with_status(400)
            .with_body(r#"{"error":{"message":"Invalid key"}}"#)
            .create();
        server
            .mock("GET", "/api/contributors")
            .match_query(listing())
            .with_status(200)
            .with_body(r#"{"data":[{"id":2,"username":"other"},{"id":3,"attributes":{"username":"jake","role":"Dev"}}]}"#)
            .create();
        let updated = server
            .mock("PUT", "/api/contributors/3")
            .match_body(Matcher::PartialJson(
                json!({ "data": { "username": "jake", "role": "Frontend Architect" } }),
            ))
            .with_status(200)
            .with_body(r#"{"data":{"id":3}}"#)
            .create();

        let id = client(&server)
            .upsert_by_username(
                "contributors",
                "jake",
                &json!({ "username": "jake", "role": "Frontend Architect" }),
            )
            .unwrap();

        assert_eq!(id, Some(3));
        updated.assert();
    }

    #[test]
    fn locale_is_forwarded() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/faqs")
            .match_query(Matcher::AllOf(vec![
                lookup("question", "Why?"),
                Matcher::UrlEncoded("locale".into(), "en".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":[{"id":4,"question":"Why?"}]}"#)
            .create();
        let updated = server
            .mock("PUT", "/api/faqs/4")
            .match_query(Matcher::UrlEncoded("locale".into(), "en".into()))
            .with_status(200)
            .with_body(r#"{"data":{"id":4}}"#)
            .create();

        let id = client(&server)
            .upsert_by_field("faqs", "question", "Why?", &json!({ "question": "Why?" }), Some("en"))
            .unwrap();

        assert_eq!(id, Some(4));
        updated.assert();
    }
}

mod fallbacks {
    use super::*;

    #[test]
    fn unique_violation_finds_existing_record() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/contributors")
            .with_status(400)
            .with_body(r#"{"error":{"message":"This attribute must be unique"}}"#)
            .create();
        server
            .mock("GET", "/api/contributors")
            .match_query(listing())
            .with_status(200)
            .with_body(r#"{"data":[{"id":9,"username":"jake"}]}"#)
            .create();

        let found = client(&server)
            .create_one("contributors", &json!({ "username": "jake" }), None)
            .unwrap();

        assert_eq!(found, Some(json!({ "id": 9, "username": "jake" })));
    }

    #[test]
    fn unique_violation_without_match_is_skipped() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/techs")
            .with_status(400)
            .with_body("unique constraint")
            .create();
        server
            .mock("GET", "/api/techs")
            .match_query(listing())
            .with_status(200)
            .with_body(r#"{"data":[{"id":1,"slug":"other"}]}"#)
            .create();

        let found = client(&server)
            .create_one("techs", &json!({ "slug": "zod" }), None)
            .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn other_create_errors_surface() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/techs")
            .with_status(500)
            .with_body("boom")
            .create();

        let err = client(&server)
            .create_one("techs", &json!({ "slug": "zod" }), None)
            .unwrap_err();

        match err {
            SeedError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn update_404_creates_instead() {
        let mut server = Server::new();
        server
            .mock("PUT", "/api/techs/5")
            .with_status(404)
            .with_body(r#"{"error":{"status":404}}"#)
            .create();
        let created = server
            .mock("POST", "/api/techs")
            .with_status(200)
            .with_body(r#"{"data":{"id":6}}"#)
            .create();

        let result = client(&server)
            .update_one("techs", 5, &json!({ "id": 5, "slug": "jwt" }), None)
            .unwrap();

        assert_eq!(result, Some(json!({ "id": 6 })));
        created.assert();
    }

    #[test]
    fn single_type_is_created_on_404() {
        let mut server = Server::new();
        server.mock("PUT", "/api/global").with_status(404).create();
        let created = server
            .mock("POST", "/api/global")
            .match_body(Matcher::PartialJson(json!({ "data": { "siteName": "Acme" } })))
            .with_status(200)
            .with_body(r#"{"data":{"id":1,"siteName":"Acme"}}"#)
            .create();

        let value = client(&server)
            .set_single("global", &json!({ "siteName": "Acme" }), None)
            .unwrap();

        assert_eq!(value["siteName"], json!("Acme"));
        created.assert();
    }

    #[test]
    fn missing_single_type_reads_as_none() {
        let mut server = Server::new();
        server.mock("GET", "/api/blog-page").with_status(404).create();

        let value = client(&server).get_single("blog-page", None).unwrap();
        assert_eq!(value, None);
    }
}

mod auth {
    use super::*;

    #[test]
    fn bearer_token_is_sent() {
        let mut server = Server::new();
        let listed = server
            .mock("GET", "/api/techs")
            .match_query(listing())
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body(r#"{"data":[{"id":1}]}"#)
            .create();

        let config = SeedConfig::new(server.url()).token(Some("secret".into()));
        let records = SeedClient::new(config)
            .unwrap()
            .list_all("techs", None)
            .unwrap();

        assert_eq!(records.len(), 1);
        listed.assert();
    }
}

mod manifest {
    use super::*;

    #[test]
    fn run_reports_ids_and_failures() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/techs")
            .match_query(lookup("slug", "tailwind-css"))
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create();
        server
            .mock("GET", "/api/techs")
            .match_query(listing())
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create();
        server
            .mock("POST", "/api/techs")
            .match_body(Matcher::PartialJson(
                json!({ "data": { "slug": "tailwind-css", "name": "Tailwind CSS" } }),
            ))
            .with_status(200)
            .with_body(r#"{"data":{"id":21}}"#)
            .create();
        server
            .mock("PUT", "/api/global")
            .with_status(200)
            .with_body(r#"{"data":{"id":1}}"#)
            .create();

        let manifest = SeedManifest {
            collections: vec![CollectionSeed {
                collection: "techs".into(),
                key: "slug".into(),
                localized: false,
                entries: vec![json!({ "name": "Tailwind CSS" }), json!({ "category": "ui" })],
            }],
            singles: vec![SingleSeed {
                uid: "global".into(),
                localized: false,
                data: json!({ "siteName": "Acme" }),
            }],
        };

        let report = seed::run(&client(&server), &manifest);

        assert_eq!(report.upserted["techs"], vec![21]);
        assert_eq!(report.singles, vec!["global".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("entry without slug"));
        assert!(!report.is_ok());
    }

    #[test]
    fn manifest_defaults() {
        let manifest: SeedManifest = serde_json::from_value(json!({
            "collections": [{ "collection": "projects", "entries": [] }]
        }))
        .unwrap();

        assert_eq!(manifest.collections[0].key, "slug");
        assert!(!manifest.collections[0].localized);
        assert!(manifest.singles.is_empty());
    }
}
