// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn without_transient_clears_message_id_only() {
    let ctx = RoutingContext {
        source: "chat-x".into(),
        channel_id: Some("C1".into()),
        user_id: Some("U1".into()),
        message_id: Some("m1".into()),
        task_id: None,
    };
    let stripped = ctx.without_transient();
    assert_eq!(stripped.message_id, None);
    assert_eq!(stripped.channel_id, ctx.channel_id);
    assert_eq!(stripped.source, ctx.source);
}

#[test]
fn kind_strings_match_wire_vocabulary() {
    assert_eq!(EngineEvent::Init { status: "ok".into(), cron: 0 }.kind(), "init");
    assert_eq!(
        EngineEvent::AgentReset { agent_id: AgentId::from_raw("a") }.kind(),
        "agent.reset"
    );
    assert_eq!(
        EngineEvent::SessionOutgoing { agent_id: AgentId::from_raw("a"), text: None }.kind(),
        "session.outgoing"
    );
}
