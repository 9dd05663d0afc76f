//! Diesel table definitions for the control store.

#![allow(missing_docs)]

diesel::table! {
    config (config_key) {
        config_key -> Text,
        config_value -> Text,
    }
}

diesel::table! {
    config_log (id) {
        id -> Nullable<Integer>,
        log_time -> Text,
        action -> Text,
        param_key -> Text,
        old_value -> Nullable<Text>,
        new_value -> Nullable<Text>,
        message -> Nullable<Text>,
    }
}

diesel::table! {
    process_log (id) {
        id -> Nullable<Integer>,
        process_id -> Integer,
        process_name -> Text,
        run_date -> Text,
        start_time -> Text,
        end_time -> Nullable<Text>,
        status -> Text,
        records_extracted -> Nullable<BigInt>,
        records_loaded -> Nullable<BigInt>,
        records_transformed -> Nullable<BigInt>,
        message -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(config, config_log, process_log);
