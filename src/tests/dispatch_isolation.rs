#[cfg(test)]
mod test {
    use std::sync::Arc;

    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    use crate::cache::token_cache::TokenCache;
    use crate::config::endpoint::EndpointConfig;
    use crate::config::settings::SettingsConfig;
    use crate::dispatch::{DispatchSummary, Dispatcher, EndpointTarget};
    use crate::error::{ErrorCategory, PublishResult};
    use crate::observability::metrics::Metrics;
    use crate::omf::compression::gunzip;
    use crate::omf::payload::parse_messages;
    use crate::omf::{OmfMessage, OmfMessageType};
    use crate::transport::{HttpTransport, TransportRequest, TransportResponse};
    use crate::tests::common::{
        eds_endpoint, json, mock_identity, mock_omf_accepting, ocs_endpoint, pi_endpoint,
        ManualClock, RecordingTransport, DISCOVERY_PATH, TOKEN_PATH,
    };

    // file contents as they sit on disk, one element per message
    const TYPES_FILE: &str = r#"[{"id": "TankMeasurement", "type": "object", "classification": "dynamic"}]"#;
    const CONTAINERS_FILE: &str = r#"[{"id": "Tank1", "typeid": "TankMeasurement"}]"#;
    const DATA_FILE: &str =
        r#"[{"containerid": "Tank1", "values": [{"Time": "2026-01-01T00:00:00Z", "Level": 4.20, "Count": 123456789012345678901234567890}]}]"#;

    const TYPE_BODY: &str = r#"{"id": "TankMeasurement", "type": "object", "classification": "dynamic"}"#;
    const DATA_BODY: &str =
        r#"{"containerid": "Tank1", "values": [{"Time": "2026-01-01T00:00:00Z", "Level": 4.20, "Count": 123456789012345678901234567890}]}"#;

    fn messages() -> Arc<[OmfMessage]> {
        let mut messages = parse_messages(OmfMessageType::Type, TYPES_FILE).unwrap();
        messages.extend(parse_messages(OmfMessageType::Container, CONTAINERS_FILE).unwrap());
        messages.extend(parse_messages(OmfMessageType::Data, DATA_FILE).unwrap());
        messages.into()
    }

    #[derive(Debug, Clone)]
    struct PanickingTransport;

    impl HttpTransport for PanickingTransport {
        async fn send(&self, request: TransportRequest) -> PublishResult<TransportResponse> {
            panic!("unexpected request to {}", request.url)
        }
    }

    fn fast_settings() -> SettingsConfig {
        let mut settings = SettingsConfig::default();
        settings.retry.attempts = 3;
        settings.retry.base_delay_ms = 1;
        settings.retry.max_delay_ms = 2;
        settings
    }

    fn dispatcher<T>(endpoints: Vec<(EndpointConfig, T)>, settings: &SettingsConfig) -> Dispatcher<T>
    where
        T: HttpTransport + Send + Sync + 'static,
    {
        let metrics = Arc::new(Metrics::new().unwrap());
        let tokens = Arc::new(TokenCache::with_clock(
            settings.safety_margin_seconds,
            metrics.clone(),
            ManualClock::at(1_800_000_000),
        ));
        let targets = endpoints
            .into_iter()
            .enumerate()
            .map(|(index, (config, transport))| EndpointTarget::new(index, config, transport))
            .collect();
        Dispatcher::new(targets, tokens, settings, metrics)
    }

    fn omf_requests(transport: &RecordingTransport) -> Vec<crate::transport::TransportRequest> {
        transport
            .requests()
            .into_iter()
            .filter(|request| request.url.ends_with("/omf"))
            .collect()
    }

    #[tokio::test]
    async fn failed_token_exchange_does_not_block_other_endpoints() {
        let broken_identity = MockServer::start_async().await;
        let token_url = broken_identity.url(TOKEN_PATH);
        broken_identity
            .mock_async(|when, then| {
                when.method(GET).path(DISCOVERY_PATH);
                then.status(200).json_body(json!({ "token_endpoint": token_url }));
            })
            .await;
        broken_identity
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(401).body("invalid_client");
            })
            .await;

        let pi_server = MockServer::start_async().await;
        mock_omf_accepting(&pi_server).await;
        let eds_server = MockServer::start_async().await;
        mock_omf_accepting(&eds_server).await;

        let broken_transport = RecordingTransport::new();
        let pi_transport = RecordingTransport::new();
        let eds_transport = RecordingTransport::new();

        let outcomes = dispatcher(
            vec![
                (ocs_endpoint("cloud", &broken_identity.base_url()), broken_transport.clone()),
                (pi_endpoint("pi", &pi_server.base_url()), pi_transport.clone()),
                (eds_endpoint("edge", &eds_server.base_url(), false), eds_transport.clone()),
            ],
            &fast_settings(),
        )
        .dispatch_all(messages())
        .await;

        let names: Vec<_> = outcomes.iter().map(|o| o.endpoint_name.as_str()).collect();
        assert_eq!(names, ["cloud", "pi", "edge"]);

        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].messages_sent, 0);
        assert_eq!(outcomes[0].error_category, Some(ErrorCategory::Auth));
        assert!(omf_requests(&broken_transport).is_empty());

        assert!(outcomes[1].success);
        assert_eq!(outcomes[1].messages_sent, 3);
        assert_eq!(omf_requests(&pi_transport).len(), 3);
        assert!(outcomes[2].success);
        assert_eq!(omf_requests(&eds_transport).len(), 3);

        let summary = DispatchSummary::new(outcomes);
        assert_eq!(summary.token_failures().count(), 1);
        assert!(summary.is_run_failure(false));
    }

    #[tokio::test]
    async fn ocs_messages_carry_omf_headers_and_bearer_token_in_order() {
        let server = MockServer::start_async().await;
        mock_identity(&server, "ocs-token", 3600).await;
        mock_omf_accepting(&server).await;
        let transport = RecordingTransport::new();

        let outcomes = dispatcher(
            vec![(ocs_endpoint("cloud", &server.base_url()), transport.clone())],
            &fast_settings(),
        )
        .dispatch_all(messages())
        .await;

        assert!(outcomes[0].success, "{:?}", outcomes[0]);

        let sent = omf_requests(&transport);
        let types: Vec<_> = sent
            .iter()
            .map(|request| request.header_value("messagetype").unwrap_or_default())
            .collect();
        assert_eq!(types, ["type", "container", "data"]);
        assert_eq!(sent[0].body.as_deref(), Some(TYPE_BODY.as_bytes()));
        assert_eq!(sent[2].body.as_deref(), Some(DATA_BODY.as_bytes()));
        for request in &sent {
            assert_eq!(request.header_value("action"), Some("create"));
            assert_eq!(request.header_value("messageformat"), Some("JSON"));
            assert_eq!(request.header_value("omfversion"), Some("1.1"));
            assert_eq!(request.header_value("Authorization"), Some("Bearer ocs-token"));
            assert_eq!(request.header_value("compression"), None);
        }

        // one refresh serves the whole run
        assert_eq!(transport.count(TOKEN_PATH), 1);
    }

    #[tokio::test]
    async fn compressed_endpoint_receives_gzip_bodies() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/omf").header("compression", "gzip");
                then.status(202);
            })
            .await;
        let transport = RecordingTransport::new();

        let outcomes = dispatcher(
            vec![(eds_endpoint("edge", &server.base_url(), true), transport.clone())],
            &fast_settings(),
        )
        .dispatch_all(messages())
        .await;

        assert!(outcomes[0].success, "{:?}", outcomes[0]);
        let sent = omf_requests(&transport);
        assert_eq!(sent.len(), 3);
        let first = gunzip(sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(first, TYPE_BODY.as_bytes());
        let last = gunzip(sent[2].body.as_deref().unwrap()).unwrap();
        assert_eq!(last, DATA_BODY.as_bytes());
        assert_eq!(sent[0].header_value("Authorization"), None);
    }

    #[tokio::test]
    async fn rejected_message_is_recorded_and_later_messages_still_sent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/omf").header("messagetype", "container");
                then.status(400).body("container definition rejected");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/omf").header("messagetype", "type");
                then.status(202);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/omf").header("messagetype", "data");
                then.status(202);
            })
            .await;
        let transport = RecordingTransport::new();

        let outcomes = dispatcher(
            vec![(pi_endpoint("pi", &server.base_url()), transport.clone())],
            &fast_settings(),
        )
        .dispatch_all(messages())
        .await;

        let outcome = &outcomes[0];
        assert!(!outcome.success);
        assert_eq!(outcome.messages_sent, 2);
        assert_eq!(outcome.error_category, Some(ErrorCategory::Dispatch));
        let detail = outcome.error_detail.as_deref().unwrap();
        assert!(detail.contains("400"));
        assert!(detail.contains("container definition rejected"));
        // 400 is not retried
        assert_eq!(omf_requests(&transport).len(), 3);

        let summary = DispatchSummary::new(outcomes);
        assert!(!summary.is_run_failure(false));
        assert!(summary.is_run_failure(true));
    }

    #[tokio::test]
    async fn stop_on_error_skips_remaining_messages() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/omf");
                then.status(400).body("bad type");
            })
            .await;
        let transport = RecordingTransport::new();
        let mut settings = fast_settings();
        settings.dispatch.stop_endpoint_on_error = true;

        let outcomes = dispatcher(
            vec![(pi_endpoint("pi", &server.base_url()), transport.clone())],
            &settings,
        )
        .dispatch_all(messages())
        .await;

        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].messages_sent, 0);
        assert_eq!(omf_requests(&transport).len(), 1);
    }

    #[tokio::test]
    async fn unavailable_endpoint_is_retried_then_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/omf");
                then.status(503).body("busy");
            })
            .await;
        let transport = RecordingTransport::new();
        let mut settings = fast_settings();
        settings.dispatch.stop_endpoint_on_error = true;

        let outcomes = dispatcher(
            vec![(pi_endpoint("pi", &server.base_url()), transport.clone())],
            &settings,
        )
        .dispatch_all(messages())
        .await;

        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].error_category, Some(ErrorCategory::Dispatch));
        assert_eq!(omf_requests(&transport).len(), 3);
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_alone() {
        let server = MockServer::start_async().await;
        mock_omf_accepting(&server).await;
        let mut settings = fast_settings();
        settings.retry.attempts = 1;

        let outcomes = dispatcher(
            vec![
                (pi_endpoint("down", "http://127.0.0.1:1"), RecordingTransport::new()),
                (pi_endpoint("up", &server.base_url()), RecordingTransport::new()),
            ],
            &settings,
        )
        .dispatch_all(messages())
        .await;

        assert_eq!(outcomes[0].endpoint_index, 0);
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].error_category, Some(ErrorCategory::Transport));
        assert_eq!(outcomes[1].endpoint_index, 1);
        assert!(outcomes[1].success);
        assert_eq!(outcomes[1].messages_sent, 3);
    }

    #[tokio::test]
    async fn panicked_worker_still_reports_a_failed_outcome() {
        let outcomes = dispatcher(
            vec![(pi_endpoint("pi", "http://127.0.0.1:1"), PanickingTransport)],
            &fast_settings(),
        )
        .dispatch_all(messages())
        .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].endpoint_name, "pi");
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].error_category, Some(ErrorCategory::Worker));

        let summary = DispatchSummary::new(outcomes);
        assert!(summary.is_run_failure(false));
    }
}
