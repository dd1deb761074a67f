use crate::infra::Server;

#[test]
fn ping_with_and_without_argument() {
    let server = Server::spawn();
    let mut conn = server.connect();

    conn.send_line("PING");
    assert_eq!(conn.read_line_reply(), "+PONG\r\n");

    conn.send_line("PING hello");
    assert_eq!(conn.read_bulk(), Some(b"hello".to_vec()));
}

#[test]
fn set_get_exists_del_round_trip() {
    let server = Server::spawn();
    let mut conn = server.connect();

    conn.send_line("SET name Alice");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");

    conn.send_line("GET name");
    assert_eq!(conn.read_bulk(), Some(b"Alice".to_vec()));

    conn.send_line("EXISTS name");
    assert_eq!(conn.read_line_reply(), ":1\r\n");

    conn.send_line("DEL name");
    assert_eq!(conn.read_line_reply(), ":1\r\n");

    conn.send_line("GET name");
    assert_eq!(conn.read_bulk(), None);
}

#[test]
fn set_joins_multi_word_values_with_single_spaces() {
    let server = Server::spawn();
    let mut conn = server.connect();

    conn.send_line("SET greeting Hello there world");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");

    conn.send_line("GET greeting");
    assert_eq!(conn.read_bulk(), Some(b"Hello there world".to_vec()));
}

#[test]
fn save_clear_load_round_trips_through_a_snapshot_file() {
    let server = Server::spawn();
    let mut conn = server.connect();

    conn.send_line("SET a 1");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");
    conn.send_line("SET b 2");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");
    conn.send_line("SET c 3");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");

    conn.send_line("SAVE");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");

    conn.send_line("CLEAR");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");

    conn.send_line("LOAD");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");

    conn.send_line("KEYS");
    let count = conn.read_array_header();
    assert_eq!(count, 3);
    let mut keys = Vec::new();
    for _ in 0..count {
        keys.push(conn.read_bulk().unwrap());
    }
    keys.sort();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn oversize_value_is_rejected_and_store_left_unchanged() {
    let server = Server::spawn();
    let mut conn = server.connect();

    let huge = "x".repeat(1_048_577);
    conn.send_line(&format!("SET k {huge}"));
    assert_eq!(conn.read_line_reply(), "-ERR Value too large\r\n");

    conn.send_line("EXISTS k");
    assert_eq!(conn.read_line_reply(), ":0\r\n");
}

#[test]
fn line_in_progress_past_the_read_buffer_ceiling_closes_with_command_too_long() {
    let server = Server::spawn();
    let mut conn = server.connect();

    // No newline, so this never frames as a command — big enough to
    // blow past the read-buffer ceiling regardless of key/value caps.
    let unterminated = vec![b'x'; 3 * 1024 * 1024];
    conn.write_raw(&unterminated);

    let mut buf = Vec::new();
    conn.read_to_end_best_effort(&mut buf);
    let text = String::from_utf8_lossy(&buf);
    assert!(text.contains("Command too long"), "got {text:?}");
}

#[test]
fn n_complete_lines_in_yield_exactly_n_replies_in_order() {
    let server = Server::spawn();
    let mut conn = server.connect();

    for i in 0..20 {
        conn.send_line(&format!("SET k{i} v{i}"));
    }
    for i in 0..20 {
        assert_eq!(conn.read_line_reply(), "+OK\r\n", "reply {i} out of order or missing");
    }

    for i in 0..20 {
        conn.send_line(&format!("GET k{i}"));
        assert_eq!(conn.read_bulk(), Some(format!("v{i}").into_bytes()));
    }
}

#[test]
fn quit_closes_the_connection_after_replying_ok() {
    let server = Server::spawn();
    let mut conn = server.connect();

    conn.send_line("QUIT");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");

    // Further reads should observe EOF (empty line from read_to_string
    // style) rather than hang, proving the server closed its side.
    let trailing = conn.read_line_reply();
    assert!(trailing.is_empty(), "expected EOF after QUIT, got {trailing:?}");
}

#[test]
fn unknown_command_and_bad_arity_produce_err_without_closing() {
    let server = Server::spawn();
    let mut conn = server.connect();

    conn.send_line("BOGUS");
    assert!(conn.read_line_reply().starts_with("-ERR"));

    conn.send_line("GET");
    assert!(conn.read_line_reply().starts_with("-ERR"));

    // Connection must still be usable.
    conn.send_line("PING");
    assert_eq!(conn.read_line_reply(), "+PONG\r\n");
}

#[test]
fn backup_with_no_args_reports_a_timestamped_sibling_path_that_exists() {
    let server = Server::spawn();
    let mut conn = server.connect();

    conn.send_line("SET k v");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");

    conn.send_line("BACKUP");
    let reported = conn.read_bulk().unwrap();
    let reported = String::from_utf8(reported).unwrap();
    assert!(reported.contains(".backup."), "got {reported:?}");
    assert!(std::path::Path::new(&reported).exists());
}

#[test]
fn info_and_stats_report_sane_bulk_bodies() {
    let server = Server::spawn();
    let mut conn = server.connect();

    conn.send_line("SET k v");
    assert_eq!(conn.read_line_reply(), "+OK\r\n");

    conn.send_line("INFO");
    let info = conn.read_bulk().unwrap();
    let info = String::from_utf8(info).unwrap();
    assert!(info.contains("version:"));
    assert!(info.contains("keys:1"));

    conn.send_line("STATS");
    let stats = conn.read_bulk().unwrap();
    let stats = String::from_utf8(stats).unwrap();
    assert!(stats.contains("keys:1"));
    assert!(stats.contains("load_factor:"));
}
