//! Answering calls from other segments.

use std::sync::Arc;

use hypeerweb_transfer::{Incoming, Operation, RemoteCall, Reply, Transport};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::segment::Segment;

impl<T: Transport> Segment<T> {
    /// Answer incoming calls until the transport closes the channel.
    pub async fn serve(self: Arc<Self>, mut incoming: mpsc::Receiver<Incoming>) {
        while let Some(request) = incoming.recv().await {
            let segment = Arc::clone(&self);
            tokio::spawn(async move {
                let reply = segment.handle(&request.call).await;
                request.respond(reply);
            });
        }
        debug!("incoming channel closed, stopped serving");
    }

    /// Run one call against this segment.
    pub async fn handle(&self, call: &RemoteCall) -> Reply {
        match self.answer(call).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(operation = ?call.operation, error = %e, "call failed");
                Reply::Failed(e.to_string())
            }
        }
    }

    async fn answer(&self, call: &RemoteCall) -> Result<Reply> {
        let reply = match call.operation {
            Operation::GetNode => Reply::Node(self.get_node(id_arg(call, 0)?).await?),
            Operation::ListNodes => Reply::Nodes(self.ordered_nodes().await?),
            Operation::Insert => {
                let attributes = call.attributes_arg().cloned().unwrap_or_default();
                Reply::Inserted(self.insert(attributes).await?)
            }
            Operation::Remove => Reply::Removed(self.remove(id_arg(call, 0)?).await?),
            Operation::Route => Reply::Route(self.route(id_arg(call, 0)?, id_arg(call, 1)?).await?),
            Operation::Validate => Reply::Valid(self.validate().await?),
        };
        Ok(reply)
    }
}

fn id_arg(call: &RemoteCall, index: usize) -> Result<hypeerweb_topology::WebId> {
    call.id_arg(index).ok_or_else(|| {
        Error::BadRequest(format!(
            "{:?} expects an identifier at argument {index}",
            call.operation
        ))
    })
}
