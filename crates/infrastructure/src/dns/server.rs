use crate::dns::resolver::QueryResolver;
use async_trait::async_trait;
use hickory_proto::op::{Header, Message, MessageType, OpCode, ResponseCode};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::sync::Arc;
use tracing::{error, warn};

/// Bridges hickory-server's request loop to the resolver pipeline: rebuild
/// the question as a plain message, run the pipeline, copy the sections
/// into the response builder.
pub struct DnsServerHandler {
    resolver: Arc<QueryResolver>,
}

impl DnsServerHandler {
    pub fn new(resolver: Arc<QueryResolver>) -> Self {
        Self { resolver }
    }

    async fn respond<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: &mut R,
    ) -> Result<ResponseInfo, std::io::Error> {
        let builder = MessageResponseBuilder::from_message_request(request);

        let info = match request.request_info() {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed request");
                let mut header = Header::response_from_request(request.header());
                header.set_response_code(ResponseCode::FormErr);
                let response = builder.error_msg(request.header(), ResponseCode::FormErr);
                return response_handle
                    .send_response(response)
                    .await
                    .or(Ok(header.into()));
            }
        };

        let mut query_message = Message::new(
            request.header().id(),
            MessageType::Query,
            OpCode::Query,
        );
        query_message.set_recursion_desired(request.header().recursion_desired());
        query_message.add_query(info.query.original().clone());

        let served = self
            .resolver
            .serve(&query_message, info.src.ip())
            .await;

        let mut header = Header::response_from_request(request.header());
        header.set_response_code(served.message.response_code());
        header.set_authoritative(served.message.authoritative());
        header.set_recursion_available(true);

        let response = builder.build(
            header,
            served.message.answers().iter(),
            served.message.name_servers().iter(),
            std::iter::empty(),
            std::iter::empty(),
        );
        response_handle.send_response(response).await
    }
}

#[async_trait]
impl RequestHandler for DnsServerHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        match self.respond(request, &mut response_handle).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "Failed to send DNS response");
                let mut header = Header::response_from_request(request.header());
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
