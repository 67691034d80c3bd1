//! Bounded chunk emitter
//!
//! The producer half writes into a bounded channel and suspends when the
//! consumer lags; that suspension is the backpressure signal. The consumer
//! half is a lazy, finite, non-restartable stream. Dropping or cancelling the
//! consumer trips a token the producer observes at its next write boundary.

#[ cfg( feature = "streaming" ) ]
mod private
{
  use std::pin::Pin;
  use std::task::{ Context, Poll };
  use tokio::sync::mpsc;
  use tokio_util::sync::CancellationToken;
  use super::super::types::orphan::*;
  use crate::error::{ GatewayError, GatewayResult };

  /// Create a connected emitter/stream pair for one request
  #[ must_use ]
  pub fn chunk_channel( request_id : impl Into< String >, capacity : usize ) -> ( ChunkEmitter, ChunkStream )
  {
    let ( sender, receiver ) = mpsc::channel( capacity.max( 1 ) );
    let cancel = CancellationToken::new();
    let request_id = request_id.into();
    (
      ChunkEmitter
      {
        request_id,
        sender,
        sequence : 0,
        cancel : cancel.clone(),
      },
      ChunkStream
      {
        receiver,
        cancel,
        finished : false,
      },
    )
  }

  /// Producer half : assigns sequence numbers and final-chunk semantics
  #[ derive( Debug ) ]
  pub struct ChunkEmitter
  {
    request_id : String,
    sender : mpsc::Sender< GatewayResult< StreamChunk > >,
    sequence : u64,
    cancel : CancellationToken,
  }

  impl ChunkEmitter
  {
    /// Next sequence number to be assigned
    pub fn sequence( &self ) -> u64
    {
      self.sequence
    }

    /// Whether the consumer has cancelled
    pub fn is_cancelled( &self ) -> bool
    {
      self.cancel.is_cancelled()
    }

    async fn send( &mut self, chunk : StreamChunk ) -> GatewayResult< () >
    {
      if self.cancel.is_cancelled()
      {
        return Err( GatewayError::cancelled( "stream consumer cancelled" ) );
      }
      tokio::select!
      {
        () = self.cancel.cancelled() =>
        {
          Err( GatewayError::cancelled( "stream consumer cancelled" ) )
        },
        sent = self.sender.send( Ok( chunk ) ) =>
        {
          sent.map_err( | _dropped | GatewayError::cancelled( "stream consumer dropped" ) )
        },
      }
    }

    /// Emit a non-final chunk; suspends while the buffer is full
    ///
    /// # Errors
    ///
    /// Returns `CANCELLED` when the consumer cancelled or went away; the
    /// producer must stop emitting.
    pub async fn emit( &mut self, delta : impl Into< String > ) -> GatewayResult< () >
    {
      let chunk = StreamChunk::delta( self.request_id.clone(), self.sequence, delta );
      self.send( chunk ).await?;
      self.sequence += 1;
      Ok( () )
    }

    /// Emit the terminal chunk and close the stream successfully
    ///
    /// # Errors
    ///
    /// Returns `CANCELLED` when the consumer is gone; the stream then ends
    /// without a final chunk, which is permitted for cancelled streams.
    pub async fn finish( mut self ) -> GatewayResult< () >
    {
      let chunk = StreamChunk::final_chunk( self.request_id.clone(), self.sequence, "" );
      self.send( chunk ).await
    }

    /// Terminate the stream with an error
    ///
    /// Chunks already delivered are not retracted; no final chunk follows.
    pub async fn fail( self, error : GatewayError )
    {
      // The consumer may already be gone; nothing to do then.
      self.sender.send( Err( error ) ).await.ok();
    }
  }

  /// Consumer half : a lazy, finite, non-restartable chunk sequence
  #[ derive( Debug ) ]
  pub struct ChunkStream
  {
    receiver : mpsc::Receiver< GatewayResult< StreamChunk > >,
    cancel : CancellationToken,
    finished : bool,
  }

  impl ChunkStream
  {
    /// Signal the producer to stop; observed at its next write boundary
    pub fn cancel( &self )
    {
      self.cancel.cancel();
    }

    /// Receive the next chunk
    pub async fn next_chunk( &mut self ) -> Option< GatewayResult< StreamChunk > >
    {
      if self.finished
      {
        return None;
      }
      match self.receiver.recv().await
      {
        Some( item ) =>
        {
          if matches!( &item, Ok( chunk ) if chunk.is_final ) || item.is_err()
          {
            self.finished = true;
          }
          Some( item )
        },
        None =>
        {
          self.finished = true;
          None
        },
      }
    }

    /// Drain the stream, concatenating deltas
    ///
    /// # Errors
    ///
    /// Returns the stream error if the producer failed.
    pub async fn collect_text( mut self ) -> GatewayResult< String >
    {
      let mut text = String::new();
      while let Some( item ) = self.next_chunk().await
      {
        let chunk = item?;
        text.push_str( &chunk.delta );
      }
      Ok( text )
    }
  }

  impl futures_core::Stream for ChunkStream
  {
    type Item = GatewayResult< StreamChunk >;

    fn poll_next( mut self : Pin< &mut Self >, cx : &mut Context< '_ > ) -> Poll< Option< Self::Item > >
    {
      if self.finished
      {
        return Poll::Ready( None );
      }
      match self.receiver.poll_recv( cx )
      {
        Poll::Ready( Some( item ) ) =>
        {
          if matches!( &item, Ok( chunk ) if chunk.is_final ) || item.is_err()
          {
            self.finished = true;
          }
          Poll::Ready( Some( item ) )
        },
        Poll::Ready( None ) =>
        {
          self.finished = true;
          Poll::Ready( None )
        },
        Poll::Pending => Poll::Pending,
      }
    }
  }

  impl Drop for ChunkStream
  {
    fn drop( &mut self )
    {
      // A dropped consumer is a cancellation : the producer must not keep
      // filling a buffer nobody drains.
      self.cancel.cancel();
    }
  }
}

#[ cfg( feature = "streaming" ) ]
crate::mod_interface!
{
  exposed use
  {
    ChunkEmitter,
    ChunkStream,
    chunk_channel,
  };
}

#[ cfg( not( feature = "streaming" ) ) ]
crate::mod_interface!
{
}
