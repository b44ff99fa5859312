//! A minimal unary gRPC call helper, standing in for generated service
//! clients (this crate hand-writes its message types; see
//! [`super::services`]).

use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

/// Invoke a single unary RPC at `path` (e.g.
/// `"/proto.CryptoService/cryptoTransfer"`) over `channel`.
pub(crate) async fn unary_call<Req, Resp>(
    channel: Channel,
    path: &'static str,
    request: Req,
) -> Result<Response<Resp>, Status>
where
    Req: prost::Message + Clone + Send + Sync + 'static,
    Resp: prost::Message + Default + Send + Sync + 'static,
{
    let mut client = Grpc::new(channel);
    client.ready().await.map_err(|e| Status::unavailable(e.to_string()))?;
    let codec = ProstCodec::default();
    let path = tonic::codegen::http::uri::PathAndQuery::from_static(path);
    client.unary(Request::new(request), path, codec).await
}
