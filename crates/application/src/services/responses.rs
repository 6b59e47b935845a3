use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};

/// SERVFAIL addressed to `request`.
pub fn failure(request: &Message) -> Message {
    reply_with_code(request, ResponseCode::ServFail)
}

/// NXDOMAIN addressed to `request`, used for blocked names.
pub fn name_error(request: &Message) -> Message {
    reply_with_code(request, ResponseCode::NXDomain)
}

/// FORMERR for a query that could not be decoded past its header.
pub fn format_error(id: u16) -> Message {
    let mut response = Message::new();
    response
        .set_id(id)
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_available(true)
        .set_response_code(ResponseCode::FormErr);
    response
}

/// Empty response that mirrors the request header and echoes its first
/// question, if any.
pub fn reply_with_code(request: &Message, code: ResponseCode) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_checking_disabled(request.checking_disabled())
        .set_recursion_available(true)
        .set_response_code(code);

    if let Some(question) = request.queries().first() {
        response.add_query(question.clone());
    }
    response
}
