use super::testing::RecordingSink;
use super::{
    CollectionType, McReplyBuilder, RedisReplyBuilder, ReplyAggregator, ReplyBuilder,
    ResponseValue, SinkReplyBuilder,
};
use crate::protocol::ClientProtocol;
use dfly_common::config::ReplyConfig;
use googletest::prelude::*;
use rstest::rstest;
use std::io;

fn redis() -> RedisReplyBuilder<RecordingSink> {
    RedisReplyBuilder::new(RecordingSink::default(), ReplyConfig::default())
}

fn memcache() -> McReplyBuilder<RecordingSink> {
    McReplyBuilder::new(RecordingSink::default(), ReplyConfig::default())
}

/// Issues a fixed mix of scalar replies through the common contract.
fn send_scalar_mix<B: SinkReplyBuilder>(builder: &mut B) {
    builder.send_ok();
    builder.send_long(42);
    builder.send_stored();
    builder.send_error("boom", "test_error");
    builder.send_simple_string("PONG");
}

#[rstest]
fn unbatched_redis_replies_map_one_to_one_to_sink_writes() {
    let mut builder = redis();
    send_scalar_mix(&mut builder);
    let writes = &builder.core().sink().writes;
    let expected: [&[u8]; 5] = [b"+OK\r\n", b":42\r\n", b"+OK\r\n", b"-ERR boom\r\n", b"+PONG\r\n"];
    assert_that!(writes.len(), eq(expected.len()));
    for (write, expected) in writes.iter().zip(expected) {
        assert_that!(write.as_slice(), eq(expected));
    }
}

#[rstest]
fn unbatched_memcache_replies_map_one_to_one_to_sink_writes() {
    let mut builder = memcache();
    send_scalar_mix(&mut builder);
    let writes = &builder.core().sink().writes;
    let expected: [&[u8]; 5] = [
        b"OK\r\n",
        b"42\r\n",
        b"STORED\r\n",
        b"SERVER_ERROR boom\r\n",
        b"PONG\r\n",
    ];
    assert_that!(writes.len(), eq(expected.len()));
    for (write, expected) in writes.iter().zip(expected) {
        assert_that!(write.as_slice(), eq(expected));
    }
}

#[rstest]
#[case(ClientProtocol::Resp)]
#[case(ClientProtocol::Memcache)]
fn batched_replies_leave_as_one_write_equal_to_unbatched_stream(#[case] protocol: ClientProtocol) {
    let mut unbatched = ReplyBuilder::new(protocol, RecordingSink::default(), ReplyConfig::default());
    send_scalar_mix(&mut unbatched);

    let mut batched = ReplyBuilder::new(protocol, RecordingSink::default(), ReplyConfig::default());
    batched.set_batch_mode(true);
    send_scalar_mix(&mut batched);
    assert_that!(batched.core().sink().attempts, eq(0));

    batched.flush_batch();
    let writes = &batched.core().sink().writes;
    assert_that!(writes.len(), eq(1));
    assert_that!(
        writes[0].as_slice(),
        eq(unbatched.core().sink().output().as_slice())
    );
    assert_that!(batched.core().io_write_cnt(), eq(1));
    assert_that!(batched.core().io_write_bytes(), eq(writes[0].len()));
}

#[rstest]
fn batch_mode_stays_buffered_until_explicit_flush_even_after_aggregation_ends() {
    let mut builder = redis();
    builder.set_batch_mode(true);
    {
        let mut agg = ReplyAggregator::new(&mut builder);
        agg.send_long(1);
    }
    assert_that!(builder.core().sink().attempts, eq(0));
    builder.flush_batch();
    assert_that!(builder.core().sink().output().as_slice(), eq(b":1\r\n".as_slice()));
}

#[rstest]
fn nested_aggregation_flushes_only_when_the_outermost_guard_drops() {
    let mut builder = redis();
    {
        let mut outer = ReplyAggregator::new(&mut builder);
        assert_that!(outer.is_nested(), eq(false));
        outer.start_array(2);
        {
            let mut inner = ReplyAggregator::new(&mut *outer);
            assert_that!(inner.is_nested(), eq(true));
            inner.send_bulk_string(b"a");
        }
        assert_that!(outer.core().sink().attempts, eq(0));
        assert_that!(outer.core().is_aggregating(), eq(true));
        outer.send_bulk_string(b"b");
    }
    let writes = &builder.core().sink().writes;
    assert_that!(writes.len(), eq(1));
    assert_that!(
        writes[0].as_slice(),
        eq(b"*2\r\n$1\r\na\r\n$1\r\nb\r\n".as_slice())
    );
    assert_that!(builder.core().is_aggregating(), eq(false));
}

#[rstest]
fn scored_array_inside_a_transaction_does_not_flush_early() {
    let mut builder = redis();
    builder.set_resp3(true);
    {
        let mut tx = ReplyAggregator::new(&mut builder);
        tx.start_array(2);
        tx.send_scored_array(&[("m".to_owned(), 2.0)], true);
        assert_that!(tx.core().sink().attempts, eq(0));
        tx.send_simple_string("OK");
    }
    assert_that!(
        builder.core().sink().output().as_slice(),
        eq(b"*2\r\n*1\r\n*2\r\n$1\r\nm\r\n,2\r\n+OK\r\n".as_slice())
    );
    assert_that!(builder.core().sink().writes.len(), eq(1));
}

#[rstest]
fn memcache_mget_matches_wire_example() {
    let mut builder = memcache();
    builder.send_mget_response(&[
        Some(ResponseValue {
            key: b"a".to_vec(),
            value: b"1".to_vec(),
            mc_ver: 0,
            mc_flag: 0,
        }),
        None,
        Some(ResponseValue {
            key: b"c".to_vec(),
            value: b"3".to_vec(),
            mc_ver: 7,
            mc_flag: 2,
        }),
    ]);
    assert_that!(
        builder.core().sink().output().as_slice(),
        eq(b"VALUE a 0 1\r\n1\r\nVALUE c 2 1 7\r\n3\r\nEND\r\n".as_slice())
    );
}

#[rstest]
#[case(1)]
#[case(5)]
#[case(17)]
fn error_counters_grow_by_exactly_the_number_of_errors(#[case] repeats: u64) {
    let mut builder = redis();
    builder.send_error("other", "other_error");
    for _ in 0..repeats {
        builder.send_error("disk full", "io_error");
    }
    let counts = builder.core().err_count();
    assert_that!(counts.get("io_error").copied(), eq(Some(repeats)));
    assert_that!(counts.get("other_error").copied(), eq(Some(1)));
    assert_that!(counts.len(), eq(2));
}

#[rstest]
fn noreply_store_produces_no_sink_write() {
    let mut builder = memcache();
    builder.set_noreply(true);
    builder.send_stored();
    builder.send_error("out of memory", "oom");
    assert_that!(builder.core().sink().attempts, eq(0));
    assert_that!(builder.core().err_count().get("oom").copied(), eq(Some(1)));
}

#[rstest]
fn protocol_selection_picks_matching_grammar() {
    let mut resp = ReplyBuilder::new(
        ClientProtocol::Resp,
        RecordingSink::default(),
        ReplyConfig::default(),
    );
    let mut mc = ReplyBuilder::new(
        ClientProtocol::Memcache,
        RecordingSink::default(),
        ReplyConfig::default(),
    );
    assert_that!(resp.protocol(), eq(ClientProtocol::Resp));
    assert_that!(mc.protocol(), eq(ClientProtocol::Memcache));
    assert_that!(resp.as_memcache_mut().is_none(), eq(true));
    assert_that!(mc.as_redis_mut().is_none(), eq(true));

    resp.send_set_skipped();
    mc.send_set_skipped();
    resp.send_protocol_error("bad");
    mc.send_protocol_error("bad");
    assert_that!(
        resp.core().sink().output().as_slice(),
        eq(b"$-1\r\n-ERR Protocol error: bad\r\n".as_slice())
    );
    assert_that!(
        mc.core().sink().output().as_slice(),
        eq(b"NOT_STORED\r\nCLIENT_ERROR bad\r\n".as_slice())
    );

    if let Some(redis) = resp.as_redis_mut() {
        redis.set_resp3(true);
        redis.send_string_arr(&["f", "v"], CollectionType::Map);
    }
    assert_that!(
        resp.core().sink().writes.last().map(Vec::as_slice),
        eq(Some(b"%1\r\n$1\r\nf\r\n$1\r\nv\r\n".as_slice()))
    );
}

#[rstest]
fn stats_snapshot_reflects_writes_and_errors() {
    let mut builder = redis();
    builder.send_ok();
    builder.send_error("syntax error", "");
    let stats = builder.core().stats();
    assert_that!(stats.io_write_cnt, eq(2));
    assert_that!(stats.io_write_bytes, eq(5 + 19));
    assert_that!(stats.err_count.get("syntax_error").copied(), eq(Some(1)));
}

#[rstest]
fn dead_connection_keeps_accepting_calls_cheaply() {
    let mut builder = RedisReplyBuilder::new(
        RecordingSink::failing(io::ErrorKind::ConnectionReset),
        ReplyConfig::default(),
    );
    builder.send_ok();
    builder.send_scored_array(&[("a".to_owned(), 1.0)], true);
    builder.send_string_arr(&["x"], CollectionType::Array);
    assert_that!(builder.error(), eq(Some(io::ErrorKind::ConnectionReset)));
    assert_that!(builder.core().sink().attempts, eq(1));
    assert_that!(builder.check_error().is_err(), eq(true));
}

#[rstest]
fn leaving_batch_mode_inside_an_aggregation_waits_for_the_guard() {
    let mut builder = redis();
    builder.set_batch_mode(true);
    {
        let mut agg = ReplyAggregator::new(&mut builder);
        agg.send_long(1);
        agg.set_batch_mode(false);
        assert_that!(agg.core().sink().attempts, eq(0));
        agg.send_long(2);
        assert_that!(agg.core().sink().attempts, eq(0));
    }
    let writes = &builder.core().sink().writes;
    assert_that!(writes.len(), eq(1));
    assert_that!(writes[0].as_slice(), eq(b":1\r\n:2\r\n".as_slice()));
}

#[rstest]
fn string_array_with_many_large_elements_keeps_exact_bytes() {
    let items: Vec<String> = (0..12_u8)
        .map(|index| char::from(b'a' + index).to_string().repeat(64))
        .collect();
    let mut builder = redis();
    builder.send_string_arr(&items, CollectionType::Array);

    let mut expected = b"*12\r\n".to_vec();
    for item in &items {
        expected.extend_from_slice(b"$64\r\n");
        expected.extend_from_slice(item.as_bytes());
        expected.extend_from_slice(b"\r\n");
    }
    let writes = &builder.core().sink().writes;
    assert_that!(writes.len(), eq(1));
    assert_that!(writes[0].as_slice(), eq(expected.as_slice()));
}
