//! Diesel table definitions for the control plane's PostgreSQL schema.

diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Text,
        display_name -> Text,
        role -> Text,
        password_hash -> Text,
        active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    sessions (id) {
        id -> Uuid,
        user_id -> Uuid,
        token_hash -> Text,
        created_at -> Timestamptz,
        expires_at -> Timestamptz,
        revoked_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    configurations (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        version -> Int4,
        default_action -> Text,
        status -> Text,
        displaced_at -> Nullable<Timestamptz>,
        fingerprint -> Nullable<Text>,
        created_by -> Uuid,
        created_at -> Timestamptz,
        modified_by -> Uuid,
        modified_at -> Timestamptz,
        submitted_by -> Nullable<Uuid>,
        submitted_at -> Nullable<Timestamptz>,
        approved_by -> Nullable<Uuid>,
        approved_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    domain_rules (id) {
        id -> Uuid,
        config_id -> Uuid,
        priority -> Int4,
        domain_selector -> Text,
        action -> Text,
        parent_proxy_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    ip_range_rules (id) {
        id -> Uuid,
        config_id -> Uuid,
        priority -> Int4,
        cidr -> Text,
        action -> Text,
    }
}

diesel::table! {
    client_acl_rules (id) {
        id -> Uuid,
        config_id -> Uuid,
        priority -> Int4,
        cidr -> Text,
        action -> Text,
    }
}

diesel::table! {
    parent_proxy_entries (id) {
        id -> Uuid,
        config_id -> Uuid,
        host -> Text,
        port -> Int4,
        priority -> Int4,
        enabled -> Bool,
    }
}

diesel::table! {
    proxies (id) {
        id -> Uuid,
        hostname -> Text,
        assigned_config -> Nullable<Uuid>,
        is_online -> Bool,
        last_seen -> Timestamptz,
        registered_ip -> Text,
        observed_fingerprint -> Nullable<Text>,
        log_capture_deadline -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    proxy_stats (id) {
        id -> Int8,
        proxy_id -> Uuid,
        captured_at -> Timestamptz,
        active_connections -> Int8,
        total_connections -> Int8,
        cache_hits -> Int8,
        cache_misses -> Int8,
        errors -> Int8,
        total_requests -> Int8,
        connect_requests -> Int8,
        responses_2xx -> Int8,
        responses_3xx -> Int8,
        responses_4xx -> Int8,
        responses_5xx -> Int8,
        err_connect_fail -> Int8,
        err_client_abort -> Int8,
        broken_server_conns -> Int8,
        bytes_in -> Int8,
        bytes_out -> Int8,
    }
}

diesel::table! {
    proxy_logs (id) {
        id -> Int8,
        proxy_id -> Uuid,
        captured_at -> Timestamptz,
        text -> Text,
    }
}

diesel::table! {
    audit_log (id) {
        id -> Uuid,
        actor -> Nullable<Uuid>,
        action -> Text,
        entity_kind -> Text,
        entity_id -> Uuid,
        before -> Nullable<Jsonb>,
        after -> Nullable<Jsonb>,
        source_ip -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(sessions -> users (user_id));
diesel::joinable!(domain_rules -> configurations (config_id));
diesel::joinable!(ip_range_rules -> configurations (config_id));
diesel::joinable!(client_acl_rules -> configurations (config_id));
diesel::joinable!(parent_proxy_entries -> configurations (config_id));
diesel::joinable!(proxies -> configurations (assigned_config));
diesel::joinable!(proxy_stats -> proxies (proxy_id));
diesel::joinable!(proxy_logs -> proxies (proxy_id));

diesel::allow_tables_to_appear_in_same_query!(
    audit_log,
    client_acl_rules,
    configurations,
    domain_rules,
    ip_range_rules,
    parent_proxy_entries,
    proxies,
    proxy_logs,
    proxy_stats,
    sessions,
    users,
);
