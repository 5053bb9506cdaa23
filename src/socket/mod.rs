/*! Communication between endpoints.

The `socket` module deals with *conversation endpoints* and *buffering*.
It provides the protocol state machine that fills and empties the send and
receive queues of a conversation.

The programming interface implemented here differs greatly from a Berkeley socket.
A socket owns no file descriptor, timer or thread: the caller hands it every
received datagram, tells it what time it is, and supplies the sink outbound
datagrams are written to. The same socket therefore runs over a host UDP
socket, a simulated link or an embedded radio alike.
*/

pub mod kcp;
